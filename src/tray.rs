//! Window and mail event handling behind the tray icon
//!
//! [`Tray`] owns the read status and drives the host's main window. The host
//! calls the `on_*` handlers from its own event loop; bus-originated events
//! reach it through [`crate::app::App`].

use crate::config::{
    Settings, CONF_KEY_HIDDEN_ON_STARTUP, CONF_KEY_HIDE_ON_CLOSE, CONF_KEY_HIDE_ON_MINIMIZE,
    TRAY_SCHEMA,
};
use crate::status::{MailStatus, ReadStatus};
use crate::visibility::{decide, Action, Observation, Request};
use tracing::{debug, info};

/// Name of the host's mail view
pub const MAIL_VIEW: &str = "mail";

/// The host's main window. Only the primitives the tray needs.
pub trait ShellWindow {
    fn show(&mut self);
    fn hide(&mut self);
    fn deiconify(&mut self);
    fn present(&mut self);
    fn is_iconified(&self) -> bool;
    fn is_visible(&self) -> bool;
    fn active_view(&self) -> String;
    fn set_active_view(&mut self, view: &str);
    /// Ask the application to quit.
    fn request_quit(&mut self);
}

/// A window-state notification from the host toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowStateChange {
    /// The iconified flag is part of this change
    pub iconified_changed: bool,
    /// The new state is iconified
    pub iconified: bool,
    /// The new state is withdrawn (the window is hidden)
    pub withdrawn: bool,
}

pub struct Tray {
    window: Box<dyn ShellWindow>,
    settings: Box<dyn Settings>,
    mail: MailStatus,
    /// Hide the window the next time it is shown
    hide_on_show: bool,
}

impl Tray {
    /// `startup` is true when the host application itself is starting, as
    /// opposed to the feature being enabled later.
    pub fn new(
        window: Box<dyn ShellWindow>,
        settings: Box<dyn Settings>,
        mail: MailStatus,
        startup: bool,
    ) -> Self {
        let hide_on_show = startup && settings.is_enabled(TRAY_SCHEMA, CONF_KEY_HIDDEN_ON_STARTUP);
        if hide_on_show {
            debug!("Main window will be hidden when first shown");
        }

        Self {
            window,
            settings,
            mail,
            hide_on_show,
        }
    }

    pub fn status(&self) -> ReadStatus {
        self.mail.status()
    }

    pub fn observe(&self) -> Observation {
        Observation {
            iconified: self.window.is_iconified(),
            visible: self.window.is_visible(),
            status: self.mail.status(),
        }
    }

    /// Run or query an action.
    ///
    /// [`Request::Query`] only reports what [`Request::Auto`] would do right
    /// now. A caller building a menu label can query first and later run the
    /// returned action with [`Request::Run`], so the label and the effect
    /// agree even if showing the menu changed the window state.
    pub fn action(&mut self, request: Request) -> Action {
        match request {
            Request::Run(action) => {
                self.commit(action);
                action
            }
            Request::Auto => {
                let action = decide(self.observe());
                self.commit(action);
                action
            }
            Request::Query => decide(self.observe()),
        }
    }

    pub fn menu_label(&self) -> &'static str {
        decide(self.observe()).label()
    }

    fn commit(&mut self, action: Action) {
        debug!("Window action {:?}", action);
        match action {
            Action::ShowAndSwitchToMailView => {
                self.window.set_active_view(MAIL_VIEW);
                self.window.show();
            }
            Action::Show => self.window.show(),
            Action::Hide => self.window.hide(),
            Action::Deiconify => self.window.deiconify(),
            Action::Present => {
                self.window.present();
                self.window.set_active_view(MAIL_VIEW);
                self.mail.set_read(true);
            }
        }
    }

    fn in_mail_view(&self) -> bool {
        self.window.active_view() == MAIL_VIEW
    }

    /// The tray icon was clicked.
    pub fn activate(&mut self) -> Action {
        self.action(Request::Auto)
    }

    pub fn quit(&mut self) {
        info!("Quit requested from tray");
        self.window.request_quit();
    }

    pub fn on_window_show(&mut self) {
        if self.hide_on_show {
            self.hide_on_show = false;
            self.window.hide();
        }

        if self.in_mail_view() {
            self.mail.set_read(true);
        }
    }

    pub fn on_focus_in(&mut self) {
        if self.in_mail_view() {
            self.mail.set_read(true);
        }
    }

    pub fn on_active_view_changed(&mut self) {
        if self.in_mail_view() {
            self.mail.set_read(true);
        }
    }

    /// Hide to the tray instead of minimizing, when enabled.
    ///
    /// The window is deiconified after hiding so it is not minimized when
    /// shown again. The hide itself produces further state changes; those
    /// carry the withdrawn flag and are ignored.
    pub fn on_window_state(&mut self, change: WindowStateChange) {
        if change.iconified_changed
            && change.iconified
            && !change.withdrawn
            && self.settings.is_enabled(TRAY_SCHEMA, CONF_KEY_HIDE_ON_MINIMIZE)
        {
            self.window.hide();
            self.window.deiconify();
        }
    }

    /// Returns true when the close was turned into a hide and must not proceed.
    pub fn on_delete_request(&mut self) -> bool {
        if self.settings.is_enabled(TRAY_SCHEMA, CONF_KEY_HIDE_ON_CLOSE) {
            self.window.hide();
            return true;
        }
        false
    }

    pub fn on_folder_unread_updated(&mut self, folder: &str, unread: Option<u32>) {
        self.mail.on_folder_unread(folder, unread);
    }

    pub fn on_checkpoint_reached(&mut self) {
        self.mail.on_checkpoint_reached();
    }

    /// Leave the window visible and the status read.
    pub fn teardown(&mut self) {
        self.window.show();
        self.mail.reset();
        self.hide_on_show = false;
    }
}
