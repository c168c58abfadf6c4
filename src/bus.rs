//! Session bus connection shared by the tray's D-Bus objects
//!
//! The connection lives for as long as the feature is enabled. The well-known
//! service name is requested in the background: exporting objects does not
//! depend on owning it. Whoever needs the outcome, such as registration with
//! the watcher, follows it through [`BusSession::name_state`].

use crate::error::{Result, TrayError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zbus::Connection;

/// Well-known name this application registers under
pub const SERVICE_NAME: &str = "org.gnome.evolution.plugin.evolution-tray";

pub const ITEM_INTERFACE: &str = "org.kde.StatusNotifierItem";
pub const ITEM_OBJECT: &str = "/StatusNotifierItem";
pub const MENU_OBJECT: &str = "/Menu";

pub const WATCHER_BUS: &str = "org.kde.StatusNotifierWatcher";
pub const WATCHER_OBJECT: &str = "/StatusNotifierWatcher";

/// Where the well-known name request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameState {
    /// No reply from the bus yet
    Pending,
    Owned,
    /// The bus refused the name or the request failed
    NotOwned,
}

/// A requested well-known name and the background task requesting it.
struct NameOwnership {
    name: &'static str,
    request: JoinHandle<()>,
    state: watch::Receiver<NameState>,
}

/// One connection to the session bus, plus at most one well-known name.
pub struct BusSession {
    connection: Connection,
    ownership: Option<NameOwnership>,
}

impl BusSession {
    /// Connect to the session bus.
    pub async fn connect() -> Result<Self> {
        let connection = Connection::session().await.map_err(|e| {
            tracing::error!("dbus: Failed to connect to D-Bus: {}", e);
            TrayError::BusUnavailable(e)
        })?;

        debug!("Connected to session bus as {:?}", connection.unique_name());
        Ok(Self::from_connection(connection))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection,
            ownership: None,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Ask the bus for `name` without waiting for the reply. Failure is only logged.
    pub fn acquire_name(&mut self, name: &'static str) {
        if self.ownership.is_some() {
            return;
        }

        let connection = self.connection.clone();
        let (outcome, state) = watch::channel(NameState::Pending);
        let request = tokio::spawn(async move {
            let owned = match connection.request_name(name).await {
                Ok(()) => {
                    info!("Acquired bus name {}", name);
                    NameState::Owned
                }
                Err(e) => {
                    warn!("dbus: RequestName {} failed: {}", name, e);
                    NameState::NotOwned
                }
            };
            outcome.send_replace(owned);
        });

        self.ownership = Some(NameOwnership { name, request, state });
    }

    /// Follows the outcome of [`Self::acquire_name`]. `None` until a name is requested.
    pub fn name_state(&self) -> Option<watch::Receiver<NameState>> {
        self.ownership.as_ref().map(|ownership| ownership.state.clone())
    }

    /// Give the well-known name back, if one was requested.
    pub async fn release_name(&mut self) {
        if let Some(ownership) = self.ownership.take() {
            ownership.request.abort();
            match self.connection.release_name(ownership.name).await {
                Ok(_) => debug!("Released bus name {}", ownership.name),
                Err(e) => debug!("dbus: ReleaseName {} failed: {}", ownership.name, e),
            }
        }
    }

    /// Release everything this session holds. Never fails.
    pub async fn disconnect(mut self) {
        self.release_name().await;
        debug!("Closing session bus connection");
        drop(self.connection);
    }
}
