//! Read/unread mail status and the icon it selects
//!
//! The status is bistable. Going unread swaps the icon; going read swaps it
//! back and, when the transition reflects the user actually looking at their
//! mail, records the current unread counts as the new checkpoint.

use crate::config::IconConfig;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStatus {
    #[default]
    Read,
    Unread,
}

/// Receives icon changes. Implemented by the exported item.
pub trait IconSink {
    fn set_icon(&mut self, icon_name: &str);
}

/// Result of reporting one folder's unread count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnreadUpdate {
    /// Change versus the previously recorded count for the folder
    pub delta: i64,
    /// Every folder is back at its checkpointed count
    pub checkpoint_reached: bool,
}

/// Per-folder unread bookkeeping owned by the host.
pub trait UnreadCounter {
    fn report(&mut self, folder: &str, unread: u32) -> UnreadUpdate;
    fn set_checkpoint(&mut self);
}

pub struct MailStatus {
    status: ReadStatus,
    icons: IconConfig,
    icon: Box<dyn IconSink>,
    counter: Box<dyn UnreadCounter>,
}

impl MailStatus {
    /// Start in [`ReadStatus::Read`]. The sink is expected to already show the read icon.
    pub fn new(icons: IconConfig, icon: Box<dyn IconSink>, counter: Box<dyn UnreadCounter>) -> Self {
        Self {
            status: ReadStatus::Read,
            icons,
            icon,
            counter,
        }
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    /// Transition to read. A no-op when already read.
    ///
    /// `commit_checkpoint` is true when the user has just seen their mail and
    /// false when the transition only re-syncs with the counter.
    pub fn set_read(&mut self, commit_checkpoint: bool) -> bool {
        if self.status == ReadStatus::Read {
            return false;
        }

        self.icon.set_icon(&self.icons.read);
        self.status = ReadStatus::Read;

        if commit_checkpoint {
            self.counter.set_checkpoint();
        }
        debug!("Mail status is now read (checkpoint: {})", commit_checkpoint);
        true
    }

    pub fn set_unread(&mut self) -> bool {
        if self.status == ReadStatus::Unread {
            return false;
        }

        self.icon.set_icon(&self.icons.unread);
        self.status = ReadStatus::Unread;
        debug!("Mail status is now unread");
        true
    }

    /// Record a folder's unread count. `None` is an unknown count and is ignored.
    ///
    /// Each report is judged by its own delta: any increase goes unread,
    /// whatever the net change since the last read.
    pub fn on_folder_unread(&mut self, folder: &str, unread: Option<u32>) {
        let Some(unread) = unread else {
            debug!("Ignoring unknown unread count for {}", folder);
            return;
        };

        let update = self.counter.report(folder, unread);
        debug!("Folder {} unread {} (delta {})", folder, unread, update.delta);

        if update.delta > 0 {
            self.set_unread();
        } else if update.checkpoint_reached {
            self.on_checkpoint_reached();
        }
    }

    /// The counter is back at its checkpoint; no new checkpoint is committed.
    pub fn on_checkpoint_reached(&mut self) {
        self.set_read(false);
    }

    /// Back to read without touching the checkpoint, for teardown.
    pub fn reset(&mut self) {
        if self.status == ReadStatus::Unread {
            self.icon.set_icon(&self.icons.read);
        }
        self.status = ReadStatus::Read;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    pub(crate) struct RecordingIcon(pub Rc<RefCell<Vec<String>>>);

    impl IconSink for RecordingIcon {
        fn set_icon(&mut self, icon_name: &str) {
            self.0.borrow_mut().push(icon_name.to_string());
        }
    }

    /// Replays scripted updates and counts checkpoint commits.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedCounter {
        pub updates: Rc<RefCell<VecDeque<UnreadUpdate>>>,
        pub reports: Rc<RefCell<Vec<(String, u32)>>>,
        pub checkpoints: Rc<RefCell<usize>>,
    }

    impl ScriptedCounter {
        pub fn push(&self, delta: i64, checkpoint_reached: bool) {
            self.updates.borrow_mut().push_back(UnreadUpdate { delta, checkpoint_reached });
        }
    }

    impl UnreadCounter for ScriptedCounter {
        fn report(&mut self, folder: &str, unread: u32) -> UnreadUpdate {
            self.reports.borrow_mut().push((folder.to_string(), unread));
            self.updates.borrow_mut().pop_front().unwrap_or_default()
        }

        fn set_checkpoint(&mut self) {
            *self.checkpoints.borrow_mut() += 1;
        }
    }

    fn tracker() -> (MailStatus, RecordingIcon, ScriptedCounter) {
        let icon = RecordingIcon::default();
        let counter = ScriptedCounter::default();
        let status = MailStatus::new(
            IconConfig::default(),
            Box::new(icon.clone()),
            Box::new(counter.clone()),
        );
        (status, icon, counter)
    }

    #[test]
    fn test_positive_delta_sets_unread() {
        let (mut status, icon, counter) = tracker();
        counter.push(3, false);

        status.on_folder_unread("inbox", Some(3));

        assert_eq!(status.status(), ReadStatus::Unread);
        assert_eq!(*icon.0.borrow(), vec!["mail-unread".to_string()]);
    }

    #[test]
    fn test_non_positive_delta_keeps_status() {
        let (mut status, icon, counter) = tracker();
        counter.push(0, false);
        counter.push(-2, false);

        status.on_folder_unread("inbox", Some(5));
        status.on_folder_unread("inbox", Some(3));

        assert_eq!(status.status(), ReadStatus::Read);
        assert!(icon.0.borrow().is_empty());
    }

    #[test]
    fn test_each_report_judged_on_its_own_delta() {
        let (mut status, icon, counter) = tracker();
        counter.push(-2, false);
        counter.push(1, false);

        // Net change since the last read is -1, but the second report on its
        // own is positive.
        status.on_folder_unread("inbox", Some(3));
        assert_eq!(status.status(), ReadStatus::Read);
        status.on_folder_unread("inbox", Some(4));

        assert_eq!(status.status(), ReadStatus::Unread);
        assert_eq!(*icon.0.borrow(), vec!["mail-unread".to_string()]);
    }

    #[test]
    fn test_unknown_count_is_ignored() {
        let (mut status, _icon, counter) = tracker();
        status.on_folder_unread("inbox", None);
        assert!(counter.reports.borrow().is_empty());
    }

    #[test]
    fn test_repeated_unread_swaps_icon_once() {
        let (mut status, icon, counter) = tracker();
        counter.push(1, false);
        counter.push(4, false);

        status.on_folder_unread("inbox", Some(1));
        status.on_folder_unread("work", Some(4));

        assert_eq!(icon.0.borrow().len(), 1);
    }

    #[test]
    fn test_set_read_commits_checkpoint() {
        let (mut status, icon, counter) = tracker();
        status.set_unread();

        assert!(status.set_read(true));
        assert_eq!(status.status(), ReadStatus::Read);
        assert_eq!(*counter.checkpoints.borrow(), 1);
        assert_eq!(icon.0.borrow().last().map(String::as_str), Some("mail-read"));
    }

    #[test]
    fn test_set_read_when_read_is_noop() {
        let (mut status, icon, counter) = tracker();

        assert!(!status.set_read(true));
        assert!(icon.0.borrow().is_empty());
        assert_eq!(*counter.checkpoints.borrow(), 0);
    }

    #[test]
    fn test_checkpoint_reached_does_not_recommit() {
        let (mut status, _icon, counter) = tracker();
        counter.push(2, false);
        counter.push(-2, true);

        status.on_folder_unread("inbox", Some(2));
        status.on_folder_unread("inbox", Some(0));

        assert_eq!(status.status(), ReadStatus::Read);
        assert_eq!(*counter.checkpoints.borrow(), 0);
    }

    #[test]
    fn test_reset_restores_read_icon() {
        let (mut status, icon, _counter) = tracker();
        status.set_unread();
        status.reset();

        assert_eq!(status.status(), ReadStatus::Read);
        assert_eq!(icon.0.borrow().last().map(String::as_str), Some("mail-read"));
    }
}
