//! In-memory per-folder unread counts with a checkpoint
//!
//! A folder seen for the first time is treated as previously having zero
//! unread messages, so its whole count is reported as the delta. On a fresh
//! start this can flag mail that was already unread before the application
//! launched.

use crate::status::{UnreadCounter, UnreadUpdate};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct FolderUnreadCounts {
    counts: HashMap<String, u32>,
    checkpoint: HashMap<String, u32>,
}

impl FolderUnreadCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, folder: &str) -> Option<u32> {
        self.counts.get(folder).copied()
    }

    /// Whether every tracked folder matches its checkpointed count.
    pub fn at_checkpoint(&self) -> bool {
        self.counts
            .iter()
            .all(|(folder, count)| *count == self.checkpoint.get(folder).copied().unwrap_or(0))
    }
}

impl UnreadCounter for FolderUnreadCounts {
    fn report(&mut self, folder: &str, unread: u32) -> UnreadUpdate {
        let was_at_checkpoint = self.at_checkpoint();
        let previous = self.counts.insert(folder.to_string(), unread).unwrap_or(0);

        UnreadUpdate {
            delta: i64::from(unread) - i64::from(previous),
            checkpoint_reached: !was_at_checkpoint && self.at_checkpoint(),
        }
    }

    fn set_checkpoint(&mut self) {
        self.checkpoint = self.counts.clone();
    }
}
