//! Registration of the tray item with the StatusNotifierWatcher
//!
//! The watcher may start after us, crash, or restart at any point. We track
//! its presence through `NameOwnerChanged` for the whole session and call
//! `RegisterStatusNotifierItem` every time a new owner appears. A failed
//! registration is not retried until the watcher's ownership changes again.

use crate::bus::{NameState, WATCHER_BUS};
use crate::error::{Result, TrayError};
use crate::proxy::StatusNotifierWatcherProxy;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zbus::fdo::DBusProxy;
use zbus::names::{BusName, UniqueName, WellKnownName};
use zbus::Connection;

/// The two bus calls the registrar makes.
#[allow(async_fn_in_trait)]
pub trait WatcherBus {
    /// Whether some connection currently owns the watcher's well-known name.
    async fn watcher_present(&self) -> Result<bool>;

    /// Call `RegisterStatusNotifierItem(service)` on the watcher.
    async fn register_item(&self, service: &str) -> Result<()>;
}

/// [`WatcherBus`] over a live session bus connection.
#[derive(Clone)]
pub struct BusWatcher {
    connection: Connection,
    name: Option<watch::Receiver<NameState>>,
}

impl BusWatcher {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            name: None,
        }
    }

    /// Wait for this name request to settle before each registration.
    pub fn with_name_request(mut self, name: Option<watch::Receiver<NameState>>) -> Self {
        self.name = name;
        self
    }

    async fn item_service(&self, service: &str) -> String {
        let Some(mut name) = self.name.clone() else {
            return service.to_string();
        };

        let state = name
            .wait_for(|state| *state != NameState::Pending)
            .await
            .map_or(NameState::NotOwned, |state| *state);
        let unique_name = self.connection.unique_name().map(|name| name.as_str());
        registration_name(service, state, unique_name)
    }
}

/// The bus name to hand to the watcher.
///
/// A watcher ignores a well-known name nobody owns, so the connection's
/// unique name stands in when the well-known one was not granted.
pub fn registration_name(service: &str, state: NameState, unique_name: Option<&str>) -> String {
    match (state, unique_name) {
        (NameState::NotOwned, Some(unique_name)) => unique_name.to_string(),
        _ => service.to_string(),
    }
}

impl WatcherBus for BusWatcher {
    async fn watcher_present(&self) -> Result<bool> {
        let dbus = DBusProxy::new(&self.connection)
            .await
            .map_err(TrayError::WatcherQuery)?;
        let name = BusName::from(WellKnownName::from_static_str_unchecked(WATCHER_BUS));
        dbus.name_has_owner(name)
            .await
            .map_err(|e| TrayError::WatcherQuery(e.into()))
    }

    async fn register_item(&self, service: &str) -> Result<()> {
        let service = self.item_service(service).await;
        let watcher = StatusNotifierWatcherProxy::new(&self.connection)
            .await
            .map_err(TrayError::WatcherProxy)?;
        watcher
            .register_status_notifier_item(&service)
            .await
            .map_err(TrayError::Registration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPresence {
    Unknown,
    Absent,
    Present,
}

pub struct Registrar<W> {
    watcher: W,
    service: String,
    presence: WatcherPresence,
}

impl<W: WatcherBus> Registrar<W> {
    pub fn new(watcher: W, service: impl Into<String>) -> Self {
        Self {
            watcher,
            service: service.into(),
            presence: WatcherPresence::Unknown,
        }
    }

    pub fn presence(&self) -> WatcherPresence {
        self.presence
    }

    /// Resolve the initial presence and register if a watcher is already running.
    ///
    /// Only a failed presence query is returned as an error.
    pub async fn start(&mut self) -> Result<()> {
        let present = self.watcher.watcher_present().await.inspect_err(|e| {
            error!("dbus: {}", e);
        })?;

        if present {
            self.presence = WatcherPresence::Present;
            self.register().await;
        } else {
            info!("No StatusNotifierWatcher on the bus yet, waiting for one");
            self.presence = WatcherPresence::Absent;
        }
        Ok(())
    }

    /// Handle a `NameOwnerChanged` for the watcher's name.
    pub async fn on_owner_changed(&mut self, new_owner: Option<&str>) {
        match new_owner.filter(|owner| !owner.is_empty()) {
            Some(owner) => {
                debug!("StatusNotifierWatcher is now owned by {}", owner);
                self.presence = WatcherPresence::Present;
                self.register().await;
            }
            None => {
                info!("StatusNotifierWatcher left the bus");
                self.presence = WatcherPresence::Absent;
            }
        }
    }

    async fn register(&self) -> bool {
        match self.watcher.register_item(&self.service).await {
            Ok(()) => {
                info!("Registered {} with StatusNotifierWatcher", self.service);
                true
            }
            Err(e) => {
                warn!("dbus: {}", e);
                false
            }
        }
    }
}

/// Subscribe to ownership changes of the watcher's well-known name, resolve
/// the initial presence, then feed every later change into `registrar` one at
/// a time until the returned task is aborted.
///
/// The subscription is made before the presence query so that a watcher
/// appearing in between is not missed.
pub async fn watch_presence(
    connection: &Connection,
    mut registrar: Registrar<BusWatcher>,
) -> Result<JoinHandle<()>> {
    let dbus = DBusProxy::new(connection)
        .await
        .map_err(TrayError::PresenceSubscription)?;
    let mut changes = dbus
        .receive_name_owner_changed_with_args(&[(0, WATCHER_BUS)])
        .await
        .map_err(|e| {
            error!("dbus: Failed to subscribe to NameOwnerChanged: {}", e);
            TrayError::PresenceSubscription(e)
        })?;

    registrar.start().await?;

    Ok(tokio::spawn(async move {
        let _dbus = dbus;
        while let Some(signal) = changes.next().await {
            let args = match signal.args() {
                Ok(args) => args,
                Err(e) => {
                    warn!("dbus: Malformed NameOwnerChanged: {}", e);
                    continue;
                }
            };
            let new_owner: &Option<UniqueName<'_>> = args.new_owner();
            registrar
                .on_owner_changed(new_owner.as_ref().map(|owner| owner.as_str()))
                .await;
        }
        debug!("NameOwnerChanged stream ended");
    }))
}
