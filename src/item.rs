//! The `org.kde.StatusNotifierItem` object
//!
//! Exposes a fixed property set, the `Activate` method and the `NewIcon`
//! signal. The icon name is the only mutable state; property reads always
//! return its current value.

use crate::bus::{ITEM_OBJECT, MENU_OBJECT};
use crate::error::Result;
use crate::status::IconSink;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use zbus::zvariant::{ObjectPath, OwnedObjectPath};
use zbus::{interface, Connection, SignalContext};

/// Name shown as the item's `Id` and `Title`
pub const APP_NAME: &str = "Evolution Tray";

/// A zero-argument capability invoked from a bus handler.
pub type Callback = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// The current icon name, shared between the bus handler and its writer.
#[derive(Debug, Clone)]
pub struct IconState(Arc<Mutex<String>>);

impl IconState {
    pub fn new(icon_name: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(icon_name.into())))
    }

    pub fn get(&self) -> String {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, icon_name: &str) {
        let mut current = self.0.lock().unwrap_or_else(|e| e.into_inner());
        current.clear();
        current.push_str(icon_name);
    }
}

pub struct StatusNotifierItem {
    icon: IconState,
    on_activate: Callback,
}

impl StatusNotifierItem {
    pub fn new(icon: IconState, on_activate: Callback) -> Self {
        Self { icon, on_activate }
    }
}

#[interface(name = "org.kde.StatusNotifierItem")]
impl StatusNotifierItem {
    /// Activate method. The coordinates are ignored and the call is always answered.
    fn activate(&self, x: i32, y: i32) {
        debug!("Tray icon activated at ({}, {})", x, y);
        if let Err(e) = (self.on_activate)() {
            warn!("Activate callback failed: {}", e);
        }
    }

    #[zbus(property)]
    fn category(&self) -> String {
        "ApplicationStatus".into()
    }

    #[zbus(property)]
    fn id(&self) -> String {
        APP_NAME.into()
    }

    #[zbus(property)]
    fn title(&self) -> String {
        APP_NAME.into()
    }

    #[zbus(property)]
    fn status(&self) -> String {
        "Active".into()
    }

    #[zbus(property)]
    fn icon_name(&self) -> String {
        self.icon.get()
    }

    #[zbus(property)]
    fn item_is_menu(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn menu(&self) -> OwnedObjectPath {
        ObjectPath::from_static_str_unchecked(MENU_OBJECT).into()
    }

    /// NewIcon signal
    #[zbus(signal)]
    async fn new_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;
}

/// Writer side of the icon state. Emits `NewIcon` only while the item is
/// exported on a connection; clones share the export state.
#[derive(Clone)]
pub struct ItemHandle {
    icon: IconState,
    exported_on: Arc<Mutex<Option<Connection>>>,
}

impl ItemHandle {
    pub fn new(icon: IconState) -> Self {
        Self {
            icon,
            exported_on: Arc::default(),
        }
    }

    pub fn icon(&self) -> &IconState {
        &self.icon
    }

    fn connection(&self) -> Option<Connection> {
        self.exported_on.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_exported(&self) -> bool {
        self.connection().is_some()
    }

    pub(crate) fn attach(&self, connection: Connection) {
        *self.exported_on.lock().unwrap_or_else(|e| e.into_inner()) = Some(connection);
    }

    pub(crate) fn detach(&self) {
        *self.exported_on.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl IconSink for ItemHandle {
    fn set_icon(&mut self, icon_name: &str) {
        self.icon.set(icon_name);

        let Some(connection) = self.connection() else {
            debug!("Item not exported, skipping NewIcon for {}", icon_name);
            return;
        };

        tokio::spawn(async move {
            let ctxt = match SignalContext::new(&connection, ITEM_OBJECT) {
                Ok(ctxt) => ctxt,
                Err(e) => {
                    warn!("dbus: Invalid item path: {}", e);
                    return;
                }
            };
            if let Err(e) = StatusNotifierItem::new_icon(&ctxt).await {
                warn!("dbus: Failed to emit NewIcon: {}", e);
            }
        });
    }
}
