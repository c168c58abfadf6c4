//! Error types for the mail tray

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrayError {
    #[error("Failed to connect to D-Bus: {0}")]
    BusUnavailable(#[source] zbus::Error),

    #[error("Failed to export object at {path}: {message}")]
    ObjectExport { path: &'static str, message: String },

    #[error("Failed to export menu at {path}: {message}")]
    MenuExport { path: &'static str, message: String },

    #[error("NameHasOwner call failed: {0}")]
    WatcherQuery(#[source] zbus::Error),

    #[error("Failed to subscribe to NameOwnerChanged: {0}")]
    PresenceSubscription(#[source] zbus::Error),

    #[error("Failed to create proxy to StatusNotifierWatcher: {0}")]
    WatcherProxy(#[source] zbus::Error),

    #[error("Failed to register with StatusNotifierWatcher: {0}")]
    Registration(#[source] zbus::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Event channel closed")]
    ChannelClosed,
}

impl TrayError {
    /// Whether the error aborts startup of the feature, as opposed to being
    /// logged and left to the watcher-presence retry path.
    pub fn is_fatal(&self) -> bool {
        match self {
            TrayError::BusUnavailable(_)
            | TrayError::ObjectExport { .. }
            | TrayError::MenuExport { .. }
            | TrayError::WatcherQuery(_)
            | TrayError::PresenceSubscription(_)
            | TrayError::ConfigError(_)
            | TrayError::IoError(_) => true,
            TrayError::WatcherProxy(_)
            | TrayError::Registration(_)
            | TrayError::ChannelClosed => false,
        }
    }
}

impl From<toml::de::Error> for TrayError {
    fn from(e: toml::de::Error) -> Self {
        TrayError::ConfigError(e.to_string())
    }
}

impl From<toml::ser::Error> for TrayError {
    fn from(e: toml::ser::Error) -> Self {
        TrayError::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TrayError::BusUnavailable(zbus::Error::Unsupported).is_fatal());
        assert!(TrayError::ObjectExport { path: "/StatusNotifierItem", message: "taken".into() }.is_fatal());
        assert!(!TrayError::Registration(zbus::Error::Unsupported).is_fatal());
        assert!(!TrayError::WatcherProxy(zbus::Error::Unsupported).is_fatal());
    }
}
