//! Client proxy for the StatusNotifierWatcher
//!
//! Only the call this item needs is declared. See
//! <https://freedesktop.org/wiki/Specifications/StatusNotifierItem/StatusNotifierWatcher/>.

use zbus::proxy;

#[proxy(
    interface = "org.kde.StatusNotifierWatcher",
    default_service = "org.kde.StatusNotifierWatcher",
    default_path = "/StatusNotifierWatcher"
)]
pub trait StatusNotifierWatcher {
    /// RegisterStatusNotifierItem method
    fn register_status_notifier_item(&self, service: &str) -> zbus::Result<()>;
}
