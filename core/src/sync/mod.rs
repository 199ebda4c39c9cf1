//! Mailbox synchronization
//!
//! [`engine::InboxSync`] owns the inbox cache behind a single writer lock
//! and exposes the initial load, the incremental poll, and refresh.
//! [`scheduler::SyncScheduler`] drives the poll on a fixed interval.

pub mod engine;
pub mod scheduler;

pub use engine::{InboxSnapshot, InboxSync};
pub use scheduler::SyncScheduler;

use serde::{Deserialize, Serialize};

/// Engine phase. All mutations of the cache happen in exactly one phase
/// transition cycle, so a non-idle engine rejects new work instead of
/// racing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No sync in flight
    #[default]
    Idle,
    /// Initial load in flight
    Loading,
    /// Incremental poll in flight
    Polling,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Loading => write!(f, "loading"),
            SyncPhase::Polling => write!(f, "polling"),
        }
    }
}

/// How the sync cursor advances after a batch lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorPolicy {
    /// Jump to wall-clock now. This is the historical behavior; a message
    /// delivered between the fetch and the clock read is never fetched.
    #[default]
    WallClock,
    /// Advance to the newest received timestamp in the cache. Gap-free;
    /// the strictly-greater filter keeps duplicates out.
    NewestMessage,
}

impl std::fmt::Display for CursorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CursorPolicy::WallClock => write!(f, "wall-clock"),
            CursorPolicy::NewestMessage => write!(f, "newest-message"),
        }
    }
}

/// What a poll tick accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Engine busy or not loaded yet; nothing was attempted
    Skipped,
    /// Poll ran and found nothing new
    NoNewMail,
    /// Poll ran and inserted this many messages
    NewMail(usize),
}
