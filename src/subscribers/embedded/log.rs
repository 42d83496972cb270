//! # LogWriter: renders stack events through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into structured log records.
//! Failures are logged at `warn`, transitions at `info`.
//!
//! ## Example output (with the `fmt` subscriber)
//! ```text
//! INFO taskstack: level change requested level=0 target=2
//! INFO taskstack: group started level=1
//! WARN taskstack: task failed to start task="db-pool" level=2 timeout_ms=1000
//! WARN taskstack: group start failed; rolled back level=1 tasks="db-pool"
//! INFO taskstack: level changed level=1 target=2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::LevelChangeRequested => {
                tracing::info!(target: "taskstack", level = ?e.level, target_level = ?e.target, "level change requested");
            }
            EventKind::LevelChanged => {
                tracing::info!(target: "taskstack", level = ?e.level, target_level = ?e.target, "level changed");
            }
            EventKind::GroupStarted => {
                tracing::info!(target: "taskstack", level = ?e.level, "group started");
            }
            EventKind::GroupStopped => {
                tracing::info!(target: "taskstack", level = ?e.level, "group stopped");
            }
            EventKind::GroupStartFailed => {
                tracing::warn!(target: "taskstack", level = ?e.level, tasks = reason, "group start failed; rolled back");
            }
            EventKind::GroupStopFailed => {
                tracing::warn!(target: "taskstack", level = ?e.level, tasks = reason, "group stop failed; kept active");
            }
            EventKind::TaskStartFailed => {
                tracing::warn!(target: "taskstack", task, level = ?e.level, timeout_ms = ?e.timeout_ms, "task failed to start");
            }
            EventKind::TaskStopFailed => {
                tracing::warn!(target: "taskstack", task, level = ?e.level, timeout_ms = ?e.timeout_ms, "task did not stop");
            }
            EventKind::TaskUnhealthy => {
                tracing::warn!(target: "taskstack", task, level = ?e.level, "task not running");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "taskstack", subscriber = task, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "taskstack", subscriber = task, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
