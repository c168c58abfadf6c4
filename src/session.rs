//! Startup and teardown of the tray's presence on the session bus

use crate::bus::{BusSession, ITEM_OBJECT, MENU_OBJECT, SERVICE_NAME};
use crate::error::{Result, TrayError};
use crate::item::{Callback, ItemHandle, StatusNotifierItem};
use crate::menu::DbusMenu;
use crate::registrar::{watch_presence, BusWatcher, Registrar};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zbus::Connection;

/// Everything the tray holds on the bus. Each part is present only once it
/// has been acquired, and is released at most once.
#[derive(Default)]
pub struct SniSession {
    bus: Option<BusSession>,
    item: Option<ItemHandle>,
    menu_exported: bool,
    presence: Option<JoinHandle<()>>,
}

impl SniSession {
    /// Connect, export the item and its menu, and start registering with the watcher.
    ///
    /// On failure everything acquired so far is released before returning.
    pub async fn init(
        item: ItemHandle,
        on_activate: Callback,
        on_properties: Callback,
        on_quit: Callback,
    ) -> Result<Self> {
        let mut session = Self::default();
        match session.start(item, on_activate, on_properties, on_quit).await {
            Ok(()) => {
                info!("StatusNotifierItem exported as {}", SERVICE_NAME);
                Ok(session)
            }
            Err(e) => {
                error!("StatusNotifierItem init failed: {}", e);
                session.teardown().await;
                Err(e)
            }
        }
    }

    async fn start(
        &mut self,
        item: ItemHandle,
        on_activate: Callback,
        on_properties: Callback,
        on_quit: Callback,
    ) -> Result<()> {
        let mut bus = BusSession::connect().await?;
        bus.acquire_name(SERVICE_NAME);
        let connection = bus.connection().clone();
        let watcher = BusWatcher::new(connection.clone()).with_name_request(bus.name_state());
        self.bus = Some(bus);

        self.export_objects(&connection, item, on_activate, on_properties, on_quit)
            .await?;

        let registrar = Registrar::new(watcher, SERVICE_NAME);
        self.presence = Some(watch_presence(&connection, registrar).await?);
        Ok(())
    }

    /// Export the item, then its menu. Each is recorded as soon as it is
    /// exported so a later failure still releases it.
    async fn export_objects(
        &mut self,
        connection: &Connection,
        item: ItemHandle,
        on_activate: Callback,
        on_properties: Callback,
        on_quit: Callback,
    ) -> Result<()> {
        let object = StatusNotifierItem::new(item.icon().clone(), on_activate);
        export(connection, ITEM_OBJECT, object)
            .await
            .map_err(|message| TrayError::ObjectExport { path: ITEM_OBJECT, message })?;
        item.attach(connection.clone());
        self.item = Some(item);

        export(connection, MENU_OBJECT, DbusMenu::new(on_properties, on_quit))
            .await
            .map_err(|message| TrayError::MenuExport { path: MENU_OBJECT, message })?;
        self.menu_exported = true;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.bus.is_some()
    }

    /// Release everything in reverse order of acquisition. Safe to call in
    /// any state and more than once.
    pub async fn teardown(&mut self) {
        if let Some(presence) = self.presence.take() {
            presence.abort();
            debug!("Stopped watching StatusNotifierWatcher presence");
        }

        if let Some(bus) = &self.bus {
            let connection = bus.connection();

            if std::mem::take(&mut self.menu_exported) {
                if let Err(e) = connection.object_server().remove::<DbusMenu, _>(MENU_OBJECT).await {
                    warn!("dbus: Failed to remove menu: {}", e);
                }
            }

            if let Some(item) = self.item.take() {
                item.detach();
                if let Err(e) = connection
                    .object_server()
                    .remove::<StatusNotifierItem, _>(ITEM_OBJECT)
                    .await
                {
                    warn!("dbus: Failed to unregister object: {}", e);
                }
            }
        }

        if let Some(bus) = self.bus.take() {
            bus.disconnect().await;
            info!("StatusNotifierItem removed from the bus");
        }
    }
}

async fn export<I: zbus::Interface>(
    connection: &Connection,
    path: &'static str,
    object: I,
) -> std::result::Result<(), String> {
    match connection.object_server().at(path, object).await {
        Ok(true) => Ok(()),
        Ok(false) => Err("an object is already exported at this path".into()),
        Err(e) => Err(e.to_string()),
    }
}
