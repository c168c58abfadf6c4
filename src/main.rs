//! Mail Tray - runs the tray icon against a headless stand-in main window
//!
//! Useful for checking the item against a real panel: clicks on the icon and
//! the menu entries are applied to the simulated window and logged. New mail
//! arrives in a simulated inbox every so often, so the unread icon shows up
//! and clearing it by activating the icon can be tried too.

use anyhow::Result;
use async_channel::Sender;
use mail_tray::tray::MAIL_VIEW;
use mail_tray::unread::FolderUnreadCounts;
use mail_tray::{App, AppEvent, Config, ShellWindow};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// How often a message lands in the simulated inbox
const MAIL_INTERVAL: Duration = Duration::from_secs(30);

/// Main window that only records its state.
struct HeadlessWindow {
    visible: bool,
    iconified: bool,
    view: String,
}

impl HeadlessWindow {
    fn new() -> Self {
        Self {
            visible: true,
            iconified: false,
            view: MAIL_VIEW.to_string(),
        }
    }
}

impl ShellWindow for HeadlessWindow {
    fn show(&mut self) {
        self.visible = true;
        info!("Window shown");
    }

    fn hide(&mut self) {
        self.visible = false;
        info!("Window hidden");
    }

    fn deiconify(&mut self) {
        self.iconified = false;
        info!("Window deiconified");
    }

    fn present(&mut self) {
        self.visible = true;
        info!("Window presented");
    }

    fn is_iconified(&self) -> bool {
        self.iconified
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn active_view(&self) -> String {
        self.view.clone()
    }

    fn set_active_view(&mut self, view: &str) {
        self.view = view.to_string();
        info!("Switched to {} view", view);
    }

    fn request_quit(&mut self) {
        info!("Application quit requested");
    }
}

/// Report a growing unread count for one folder until the app stops listening.
async fn simulate_mail(events: Sender<AppEvent>) {
    let mut ticks = tokio::time::interval(MAIL_INTERVAL);
    ticks.tick().await;

    let mut unread = 0u32;
    loop {
        ticks.tick().await;
        unread += 1;
        debug!("Simulated inbox now has {} unread", unread);
        let event = AppEvent::FolderUnread {
            folder: "inbox".to_string(),
            unread: Some(unread),
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    info!("Starting Mail Tray v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let config = match std::env::args().nth(1) {
            Some(path) => Config::load_from(path).await?,
            None => Config::load().await?,
        };
        info!("Configuration loaded from {}", config.config_path().display());

        let mut app = App::start(
            &config,
            Box::new(HeadlessWindow::new()),
            Box::new(FolderUnreadCounts::new()),
            Box::new(|| info!("Properties requested from tray")),
            true,
        )
        .await?;
        app.tray_mut().on_window_show();
        let mail = tokio::spawn(simulate_mail(app.sender()));

        tokio::select! {
            result = app.run() => {
                if let Err(e) = result {
                    tracing::warn!("Tray event loop ended: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }

        mail.abort();
        app.shutdown().await;
        Ok::<_, anyhow::Error>(())
    })?;

    info!("Mail Tray shutting down");
    Ok(())
}
