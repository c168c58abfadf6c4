//! Mail Tray - a StatusNotifierItem tray icon for a desktop mail client
//!
//! Publishes the client on the session bus as an `org.kde.StatusNotifierItem`
//! with a two-entry menu, shows read/unread mail through the icon, and turns
//! clicks on the icon into show/hide/present actions on the main window.

pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod item;
pub mod menu;
pub mod proxy;
pub mod registrar;
pub mod session;
pub mod status;
pub mod tray;
pub mod unread;
pub mod visibility;

pub use app::{App, AppEvent};
pub use config::{Config, Settings};
pub use error::{Result, TrayError};
pub use status::{ReadStatus, UnreadCounter};
pub use tray::{ShellWindow, Tray, WindowStateChange};
pub use visibility::{Action, Request};
