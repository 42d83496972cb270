//! # Events emitted while a leveled stack changes or inspects its level.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Level events**: requested level changes and per-group transitions
//! - **Task events**: individual members reported by a group operation
//! - **Subscriber events**: delivery problems inside the subscriber fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task name,
//! the level the stack was at, and timeouts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskstack::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskStartFailed)
//!     .with_task("db-pool")
//!     .with_level(1)
//!     .with_timeout(Duration::from_secs(1));
//!
//! assert_eq!(ev.kind, EventKind::TaskStartFailed);
//! assert_eq!(ev.task.as_deref(), Some("db-pool"));
//! assert_eq!(ev.level, Some(1));
//! assert_eq!(ev.timeout_ms, Some(1000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of stack events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Level events ===
    /// A level change was requested.
    ///
    /// Sets:
    /// - `level`: active count before the change
    /// - `target`: requested level
    LevelChangeRequested,

    /// A dormant group started and became active.
    ///
    /// Sets:
    /// - `level`: active count after promotion
    GroupStarted,

    /// A dormant group failed to start and was put back on the dormant side.
    ///
    /// Sets:
    /// - `level`: active count (unchanged)
    /// - `reason`: comma-separated names of the failing tasks
    GroupStartFailed,

    /// An active group stopped and became dormant.
    ///
    /// Sets:
    /// - `level`: active count after demotion
    GroupStopped,

    /// An active group failed to stop and was kept on the active side.
    ///
    /// Sets:
    /// - `level`: active count (unchanged)
    /// - `reason`: comma-separated names of the stuck tasks
    GroupStopFailed,

    /// A level change finished.
    ///
    /// Sets:
    /// - `level`: resulting active count
    /// - `target`: requested level
    LevelChanged,

    // === Task events ===
    /// A member did not acknowledge a successful start before the deadline.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `level`: level the group was being promoted to
    /// - `timeout_ms`: per-attempt start timeout
    TaskStartFailed,

    /// A member did not finish before the stop deadline.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `level`: level the group was occupying
    /// - `timeout_ms`: per-attempt stop timeout
    TaskStopFailed,

    /// Inspection found a member of an active group no longer running.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `level`: number of fully healthy groups below it
    TaskUnhealthy,
}

/// Stack event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Stack level the event refers to.
    pub level: Option<usize>,
    /// Requested level for level-change events.
    pub target: Option<usize>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (task lists, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            level: None,
            target: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the stack level.
    #[inline]
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = Some(level);
        self
    }

    /// Attaches the requested level.
    #[inline]
    pub fn with_target(mut self, target: usize) -> Self {
        self.target = Some(target);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
