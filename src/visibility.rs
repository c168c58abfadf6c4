//! Deciding what a click on the tray icon should do to the main window

use crate::status::ReadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Hide,
    Show,
    ShowAndSwitchToMailView,
    Deiconify,
    Present,
}

impl Action {
    /// Label for a menu entry that performs this action.
    pub fn label(self) -> &'static str {
        match self {
            Action::Hide => "_Hide",
            Action::Show => "_Show",
            Action::ShowAndSwitchToMailView => "Show _Mail",
            Action::Deiconify => "_Restore",
            Action::Present => "_Activate",
        }
    }
}

/// What the caller wants from [`crate::tray::Tray::action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Decide from the current state and run the result
    Auto,
    /// Decide from the current state without running anything
    Query,
    /// Run this action as is
    Run(Action),
}

/// Window and mail state sampled at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub iconified: bool,
    pub visible: bool,
    pub status: ReadStatus,
}

/// Pick the action for `observation`.
///
/// An iconified window is always restored first. Otherwise unread mail turns
/// a hide into a present and a show into a show-and-switch.
pub fn decide(observation: Observation) -> Action {
    let unread = observation.status == ReadStatus::Unread;

    if observation.iconified {
        Action::Deiconify
    } else if observation.visible {
        if unread {
            Action::Present
        } else {
            Action::Hide
        }
    } else if unread {
        Action::ShowAndSwitchToMailView
    } else {
        Action::Show
    }
}
