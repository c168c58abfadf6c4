//! Configuration management for the mail tray

use crate::error::{Result, TrayError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Settings schema the behavior toggles are read from
pub const TRAY_SCHEMA: &str = "org.gnome.evolution.plugin.evolution-tray";

pub const CONF_KEY_HIDDEN_ON_STARTUP: &str = "hidden-on-startup";
pub const CONF_KEY_HIDE_ON_MINIMIZE: &str = "hide-on-minimize";
pub const CONF_KEY_HIDE_ON_CLOSE: &str = "hide-on-close";

/// Boolean key-value read interface for the behavior toggles.
pub trait Settings {
    fn is_enabled(&self, schema: &str, key: &str) -> bool;
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to the configuration file
    #[serde(skip)]
    config_path: PathBuf,

    /// Window behavior toggles
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Icon names shown for each read status
    #[serde(default)]
    pub icons: IconConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Hide the main window the first time it is shown
    #[serde(default)]
    pub hidden_on_startup: bool,

    /// Hide to tray instead of minimizing
    #[serde(default)]
    pub hide_on_minimize: bool,

    /// Hide to tray instead of closing
    #[serde(default)]
    pub hide_on_close: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconConfig {
    #[serde(default = "default_read_icon")]
    pub read: String,

    #[serde(default = "default_unread_icon")]
    pub unread: String,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            read: default_read_icon(),
            unread: default_unread_icon(),
        }
    }
}

impl Config {
    /// Load configuration from the platform config directory, creating a default if absent
    pub async fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?).await
    }

    /// Load configuration from an explicit path, creating a default if absent
    pub async fn load_from(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            let mut config: Config = toml::from_str(&content)?;
            config.config_path = config_path;
            Ok(config)
        } else {
            let config = Config {
                config_path,
                ..Default::default()
            };
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&self.config_path, content).await?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "gnome", "MailTray")
            .ok_or_else(|| TrayError::ConfigError("Could not determine config directory".into()))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

impl Settings for Config {
    fn is_enabled(&self, schema: &str, key: &str) -> bool {
        if schema != TRAY_SCHEMA {
            warn!("Unknown settings schema {}", schema);
            return false;
        }

        match key {
            CONF_KEY_HIDDEN_ON_STARTUP => self.behavior.hidden_on_startup,
            CONF_KEY_HIDE_ON_MINIMIZE => self.behavior.hide_on_minimize,
            CONF_KEY_HIDE_ON_CLOSE => self.behavior.hide_on_close,
            _ => {
                warn!("Unknown settings key {} in {}", key, schema);
                false
            }
        }
    }
}

fn default_read_icon() -> String { "mail-read".to_string() }
fn default_unread_icon() -> String { "mail-unread".to_string() }
