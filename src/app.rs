//! Application wiring: bus callbacks and host events onto the single event loop

use crate::config::Config;
use crate::error::{Result, TrayError};
use crate::item::{Callback, IconState, ItemHandle};
use crate::session::SniSession;
use crate::status::{MailStatus, UnreadCounter};
use crate::tray::{ShellWindow, Tray, WindowStateChange};
use async_channel::{Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, info};

/// Events handled on the application loop.
///
/// The first three come from the bus objects, the rest from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The tray icon was activated
    Activate,
    /// "Properties" was picked from the tray menu
    ShowProperties,
    /// "Quit" was picked from the tray menu
    Quit,
    /// A folder's unread count changed; `None` when the host does not know it
    FolderUnread { folder: String, unread: Option<u32> },
    /// The unread counter is back at its checkpoint
    CheckpointReached,
    WindowShown,
    FocusIn,
    ActiveViewChanged,
    WindowState(WindowStateChange),
}

/// A callback that only enqueues `event`.
pub fn forward(sender: &Sender<AppEvent>, event: AppEvent) -> Callback {
    let sender = sender.clone();
    Arc::new(move || {
        sender
            .try_send(event.clone())
            .map_err(|_| TrayError::ChannelClosed)
    })
}

/// The running feature: window/mail state plus its bus presence.
pub struct App {
    tray: Tray,
    session: SniSession,
    sender: Sender<AppEvent>,
    events: Receiver<AppEvent>,
    on_properties: Box<dyn FnMut()>,
}

impl App {
    /// Bring the tray up on the session bus.
    ///
    /// `on_properties` opens the host's settings UI.
    pub async fn start(
        config: &Config,
        window: Box<dyn ShellWindow>,
        counter: Box<dyn UnreadCounter>,
        on_properties: Box<dyn FnMut()>,
        startup: bool,
    ) -> Result<Self> {
        let (sender, events) = async_channel::unbounded();
        let item = ItemHandle::new(IconState::new(config.icons.read.as_str()));

        let session = SniSession::init(
            item.clone(),
            forward(&sender, AppEvent::Activate),
            forward(&sender, AppEvent::ShowProperties),
            forward(&sender, AppEvent::Quit),
        )
        .await?;

        let mail = MailStatus::new(config.icons.clone(), Box::new(item), counter);
        let tray = Tray::new(window, Box::new(config.clone()), mail, startup);

        Ok(Self::new(tray, session, (sender, events), on_properties))
    }

    pub fn new(
        tray: Tray,
        session: SniSession,
        (sender, events): (Sender<AppEvent>, Receiver<AppEvent>),
        on_properties: Box<dyn FnMut()>,
    ) -> Self {
        Self {
            tray,
            session,
            sender,
            events,
            on_properties,
        }
    }

    /// For the host to queue its own events while [`Self::run`] is going.
    pub fn sender(&self) -> Sender<AppEvent> {
        self.sender.clone()
    }

    /// The tray, for hosts that drive the loop themselves with
    /// [`Self::next_event`] and need an answer back, as for a close request.
    pub fn tray_mut(&mut self) -> &mut Tray {
        &mut self.tray
    }

    /// Wait for the next queued event without handling it.
    pub async fn next_event(&self) -> Result<AppEvent> {
        self.events.recv().await.map_err(|_| TrayError::ChannelClosed)
    }

    /// Handle one event. Returns false once the loop should stop.
    pub fn handle(&mut self, event: AppEvent) -> bool {
        debug!("Handling {:?}", event);
        match event {
            AppEvent::Activate => {
                self.tray.activate();
                true
            }
            AppEvent::ShowProperties => {
                (self.on_properties)();
                true
            }
            AppEvent::Quit => {
                self.tray.quit();
                false
            }
            AppEvent::FolderUnread { folder, unread } => {
                self.tray.on_folder_unread_updated(&folder, unread);
                true
            }
            AppEvent::CheckpointReached => {
                self.tray.on_checkpoint_reached();
                true
            }
            AppEvent::WindowShown => {
                self.tray.on_window_show();
                true
            }
            AppEvent::FocusIn => {
                self.tray.on_focus_in();
                true
            }
            AppEvent::ActiveViewChanged => {
                self.tray.on_active_view_changed();
                true
            }
            AppEvent::WindowState(change) => {
                self.tray.on_window_state(change);
                true
            }
        }
    }

    /// Process events until quit is requested.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let event = self.next_event().await?;
            if !self.handle(event) {
                return Ok(());
            }
        }
    }

    /// Take the tray off the bus and leave the window visible.
    pub async fn shutdown(mut self) {
        self.session.teardown().await;
        self.tray.teardown();
        info!("Tray shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ReadStatus;
    use crate::tray::tests::harness_with;
    use std::cell::Cell;
    use std::rc::Rc;

    fn app() -> (App, Sender<AppEvent>, crate::tray::tests::FakeWindow, Rc<Cell<usize>>) {
        let h = harness_with(Config::default(), false);
        let window = h.window.clone();
        let opened = Rc::new(Cell::new(0));
        let on_properties = {
            let opened = opened.clone();
            Box::new(move || opened.set(opened.get() + 1))
        };
        let app = App::new(h.tray, SniSession::default(), async_channel::unbounded(), on_properties);
        let sender = app.sender();
        (app, sender, window, opened)
    }

    #[test]
    fn test_forward_enqueues_event() {
        let (sender, events) = async_channel::unbounded();
        let callback = forward(&sender, AppEvent::Activate);

        callback().unwrap();
        assert_eq!(events.try_recv().unwrap(), AppEvent::Activate);
    }

    #[test]
    fn test_forward_reports_closed_channel() {
        let (sender, events) = async_channel::unbounded();
        let callback = forward(&sender, AppEvent::Quit);
        drop(events);

        assert!(matches!(callback(), Err(TrayError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_run_until_quit() {
        let (mut app, sender, window, opened) = app();
        sender.send(AppEvent::Activate).await.unwrap();
        sender.send(AppEvent::ShowProperties).await.unwrap();
        sender.send(AppEvent::Quit).await.unwrap();
        sender.send(AppEvent::Activate).await.unwrap();

        app.run().await.unwrap();

        assert_eq!(opened.get(), 1);
        assert_eq!(window.0.borrow().calls, vec!["show", "quit"]);
        // The event after quit is left unhandled.
        assert_eq!(app.events.len(), 1);
    }

    #[tokio::test]
    async fn test_run_ends_when_channel_closes() {
        let (mut app, sender, _window, _opened) = app();
        sender.close();
        assert!(matches!(app.run().await, Err(TrayError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_unread_then_activate_presents_and_commits() {
        let h = harness_with(Config::default(), false);
        let (window, icon, counter) = (h.window.clone(), h.icon.clone(), h.counter.clone());
        window.0.borrow_mut().visible = true;
        let mut app = App::new(h.tray, SniSession::default(), async_channel::unbounded(), Box::new(|| {}));
        let sender = app.sender();

        counter.push(2, false);
        sender
            .send(AppEvent::FolderUnread { folder: "inbox".into(), unread: Some(2) })
            .await
            .unwrap();
        let event = app.next_event().await.unwrap();
        assert!(app.handle(event));
        assert_eq!(app.tray_mut().status(), ReadStatus::Unread);
        assert_eq!(icon.0.borrow().last().map(String::as_str), Some("mail-unread"));

        sender.send(AppEvent::Activate).await.unwrap();
        sender.send(AppEvent::Quit).await.unwrap();
        app.run().await.unwrap();

        assert_eq!(app.tray_mut().status(), ReadStatus::Read);
        assert_eq!(icon.0.borrow().last().map(String::as_str), Some("mail-read"));
        assert_eq!(*counter.checkpoints.borrow(), 1);
        let state = window.0.borrow();
        assert_eq!(state.calls, vec!["present", "set_active_view", "quit"]);
        assert_eq!(state.view, "mail");
    }

    #[test]
    fn test_host_events_reach_tray() {
        let (mut app, _sender, window, _opened) = app();

        assert!(app.handle(AppEvent::FolderUnread { folder: "inbox".into(), unread: None }));
        assert!(app.handle(AppEvent::CheckpointReached));
        assert!(app.handle(AppEvent::FocusIn));
        assert!(app.handle(AppEvent::WindowShown));
        assert!(app.handle(AppEvent::ActiveViewChanged));
        assert!(app.handle(AppEvent::WindowState(WindowStateChange {
            iconified_changed: true,
            iconified: true,
            withdrawn: false,
        })));

        // Hide on minimize is off by default and the view is not mail.
        assert!(window.0.borrow().calls.is_empty());
        assert_eq!(app.tray_mut().status(), ReadStatus::Read);
    }

    #[tokio::test]
    async fn test_shutdown_shows_window() {
        let (mut app, _sender, window, _opened) = app();
        app.tray_mut().on_folder_unread_updated("inbox", None);

        app.shutdown().await;

        assert_eq!(window.0.borrow().calls, vec!["show"]);
    }

    #[test]
    fn test_activate_through_app() {
        let (mut app, _sender, window, _opened) = app();
        window.0.borrow_mut().visible = true;

        assert!(app.handle(AppEvent::Activate));
        assert!(!window.0.borrow().visible);
        assert_eq!(app.tray_mut().status(), ReadStatus::Read);
    }
}
