//! Interval-driven poll scheduler
//!
//! Owns the background task that ticks [`InboxSync::poll`] on a fixed
//! period. Failed ticks are logged and dropped; the engine's phase guard
//! already skips a tick that would overlap in-flight work, so the
//! scheduler itself stays stateless.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::sync::engine::InboxSync;
use crate::sync::PollOutcome;

/// Handle to the background poll loop.
///
/// Stopping or dropping the handle aborts the task; a request in flight
/// at that moment is cancelled with it.
pub struct SyncScheduler {
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Spawn the poll loop on the current runtime
    pub fn start(engine: Arc<InboxSync>, every: Duration) -> Self {
        info!(period_secs = every.as_secs(), "sync scheduler started");
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately; polling starts one
            // period after the initial load
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match engine.poll().await {
                    Ok(PollOutcome::NewMail(count)) => {
                        debug!(count, "scheduled sync delivered new mail");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "scheduled sync failed, dropping tick");
                    }
                }
            }
        });
        Self { task }
    }

    /// Abort the poll loop
    pub fn stop(&self) {
        debug!("sync scheduler stopped");
        self.task.abort();
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}
