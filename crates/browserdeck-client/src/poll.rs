//! Polling fallback: periodic point-in-time status fetches.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

use browserdeck_core::{StatusPatch, TaskId};

use crate::error::ClientError;
use crate::http::StatusSource;

/// Period of the polling fallback.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Fetches the status of one task on a fixed schedule.
///
/// Engaged when the channel cannot be maintained. Each fetched fragment
/// merges through the same partial-patch rule as channel updates, so the
/// poller and the channel can momentarily overlap without special casing.
pub struct StatusPoller<S: ?Sized> {
    source: Arc<S>,
    task_id: TaskId,
    ticker: Interval,
}

impl<S: StatusSource + ?Sized> StatusPoller<S> {
    /// Create a poller for a task. The first tick fires immediately.
    pub fn new(source: Arc<S>, task_id: TaskId, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            source,
            task_id,
            ticker,
        }
    }

    /// Wait for the next tick and fetch.
    ///
    /// An `Err` is a surfaced, non-fatal fetch failure: the schedule keeps
    /// running and the caller is expected to call again.
    pub async fn next_patch(&mut self) -> Result<StatusPatch, ClientError> {
        self.ticker.tick().await;
        self.source.fetch_status(&self.task_id).await
    }
}
