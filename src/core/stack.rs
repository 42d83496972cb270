//! # LeveledStack: ordered groups raised and lowered with rollback.
//!
//! A [`LeveledStack`] keeps its [`TaskGroup`]s in two ordered collections that together
//! form one logical stack:
//!
//! ```text
//!            top ┌──────────┐
//!                │ group C  │  dormant (front = lowest not yet active)
//!                ├──────────┤
//!                │ group B  │  dormant
//!   level = 1 ─► ├══════════┤
//!                │ group A  │  active (last = top-most active)
//!         bottom └──────────┘
//! ```
//!
//! ## Level changes
//! ```text
//! bring_up_to_level(n):                      bring_down_to_level(n):
//!   while active < n:                          while active > n:
//!     ├─► pop lowest dormant group               ├─► pop top-most active group
//!     ├─► group.start(start_timeout)             ├─► group.stop(stop_timeout)
//!     ├─ any failure ─► stop it, push back,      ├─ any failure ─► push back on active,
//!     │                 break                    │                 break
//!     └─ ok ─► push on active                    └─ ok ─► push on front of dormant
//! ```
//!
//! ## Rules
//! - Groups move strictly in stack order: bottom-up when raising, top-down when lowering.
//! - A failure halts the change; the offending group returns to the side it started on.
//! - The resulting level is returned and may differ from the requested one.
//! - `inspect` returns the number of fully healthy groups below the lowest unhealthy one,
//!   on the assumption that higher levels depend on lower ones.
//! - Membership is fixed once the first level change has been attempted.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::builder::StackBuilder;
use crate::core::config::StackConfig;
use crate::error::SuperviseError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskGroup;

/// Ordered stack of task groups with a single "level" knob.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use taskstack::{InitAck, LeveledStack, StackConfig, StopSignal, SupervisedTask, TaskGroup};
///
/// fn service(name: &str) -> TaskGroup {
///     TaskGroup::new().with(SupervisedTask::new(name, |ack: InitAck, stop: StopSignal| async move {
///         ack.succeed();
///         stop.cancelled().await;
///         Ok(())
///     }))
/// }
///
/// #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut stack = LeveledStack::new(StackConfig::default());
///     stack.push_top(service("storage"))?;
///     stack.push_top(service("api"))?;
///
///     assert_eq!(stack.set_level(2).await, 2);
///     assert_eq!(stack.inspect(Duration::from_millis(5)).await, 2);
///     assert_eq!(stack.set_level(0).await, 0);
///     Ok(())
/// }
/// ```
pub struct LeveledStack<T = ()> {
    cfg: StackConfig,
    bus: Bus,
    dormant: VecDeque<TaskGroup<T>>,
    active: Vec<TaskGroup<T>>,
    sealed: bool,
    listener: Option<CancellationToken>,
}

impl LeveledStack {
    /// Returns a builder for a stack with event subscribers.
    ///
    /// The value type of the built stack is chosen by [`StackBuilder::build`].
    pub fn builder(cfg: StackConfig) -> StackBuilder {
        StackBuilder::new(cfg)
    }
}

impl<T> LeveledStack<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty stack without subscribers.
    pub fn new(cfg: StackConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::from_parts(cfg, bus, None)
    }

    pub(crate) fn from_parts(cfg: StackConfig, bus: Bus, listener: Option<CancellationToken>) -> Self {
        Self {
            cfg,
            bus,
            dormant: VecDeque::new(),
            active: Vec::new(),
            sealed: false,
            listener,
        }
    }

    /// Places a group on top of the stack (dormant).
    ///
    /// ### Errors
    /// [`SuperviseError::StackSealed`] once a level change has been attempted.
    pub fn push_top(&mut self, group: TaskGroup<T>) -> Result<(), SuperviseError> {
        if self.sealed {
            return Err(SuperviseError::StackSealed);
        }
        self.dormant.push_back(group);
        Ok(())
    }

    /// Current level: the number of active groups counted from the bottom.
    pub fn level(&self) -> usize {
        self.active.len()
    }

    /// Total number of groups (active + dormant).
    pub fn depth(&self) -> usize {
        self.active.len() + self.dormant.len()
    }

    /// Number of dormant groups.
    pub fn dormant_len(&self) -> usize {
        self.dormant.len()
    }

    /// Active groups from the bottom up.
    pub fn active(&self) -> impl Iterator<Item = &TaskGroup<T>> {
        self.active.iter()
    }

    /// Dormant groups from the lowest up.
    pub fn dormant(&self) -> impl Iterator<Item = &TaskGroup<T>> {
        self.dormant.iter()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &StackConfig {
        &self.cfg
    }

    /// Creates a receiver for subsequent stack events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Moves the stack to `level` and returns the level actually reached.
    ///
    /// Raises with [`bring_up_to_level`](Self::bring_up_to_level), lowers with
    /// [`bring_down_to_level`](Self::bring_down_to_level), or does nothing when
    /// already there.
    pub async fn set_level(&mut self, level: usize) -> usize {
        let current = self.active.len();
        if current == level {
            return level;
        }
        self.bus.publish(
            Event::new(EventKind::LevelChangeRequested)
                .with_level(current)
                .with_target(level),
        );

        let reached = if current < level {
            self.bring_up_to_level(level).await
        } else {
            self.bring_down_to_level(level).await
        };

        self.bus.publish(
            Event::new(EventKind::LevelChanged)
                .with_level(reached)
                .with_target(level),
        );
        reached
    }

    /// Starts dormant groups bottom-up until `level` groups are active.
    ///
    /// Stops at the first group with a member that fails to start: that group is
    /// stopped again and returned to the bottom of the dormant side. Also stops when
    /// no dormant group is left.
    pub async fn bring_up_to_level(&mut self, level: usize) -> usize {
        self.sealed = true;
        let timeout = self.cfg.start_timeout();

        while self.active.len() < level {
            let Some(mut group) = self.dormant.pop_front() else {
                tracing::debug!(level = self.active.len(), target_level = level, "no dormant group left");
                break;
            };
            let next = self.active.len() + 1;

            let mut failed = Vec::new();
            group
                .start(timeout, |task| failed.push(task.name().to_string()))
                .await;

            if failed.is_empty() {
                self.active.push(group);
                tracing::debug!(level = next, "group promoted");
                self.bus
                    .publish(Event::new(EventKind::GroupStarted).with_level(next));
                continue;
            }

            for name in &failed {
                self.bus.publish(
                    Event::new(EventKind::TaskStartFailed)
                        .with_task(name.as_str())
                        .with_level(next)
                        .with_timeout(timeout),
                );
            }
            group.stop(self.cfg.stop_timeout(), |_| {}).await;
            self.dormant.push_front(group);

            tracing::warn!(level = next, tasks = ?failed, "group failed to start; rolled back");
            self.bus.publish(
                Event::new(EventKind::GroupStartFailed)
                    .with_level(self.active.len())
                    .with_reason(failed.join(",")),
            );
            break;
        }

        self.active.len()
    }

    /// Stops active groups top-down until only `level` groups are active.
    ///
    /// Stops at the first group with a member still executing at the deadline: that
    /// group stays on top of the active side.
    pub async fn bring_down_to_level(&mut self, level: usize) -> usize {
        self.sealed = true;
        let timeout = self.cfg.stop_timeout();

        while self.active.len() > level {
            let Some(mut group) = self.active.pop() else {
                break;
            };
            let from = self.active.len() + 1;

            let mut stuck = Vec::new();
            group
                .stop(timeout, |task| stuck.push(task.name().to_string()))
                .await;

            if stuck.is_empty() {
                self.dormant.push_front(group);
                tracing::debug!(level = from - 1, "group demoted");
                self.bus
                    .publish(Event::new(EventKind::GroupStopped).with_level(from - 1));
                continue;
            }

            for name in &stuck {
                self.bus.publish(
                    Event::new(EventKind::TaskStopFailed)
                        .with_task(name.as_str())
                        .with_level(from)
                        .with_timeout(timeout),
                );
            }
            self.active.push(group);

            tracing::warn!(level = from, tasks = ?stuck, "group failed to stop; kept active");
            self.bus.publish(
                Event::new(EventKind::GroupStopFailed)
                    .with_level(from)
                    .with_reason(stuck.join(",")),
            );
            break;
        }

        self.active.len()
    }

    /// Returns the number of fully healthy active groups below the lowest unhealthy one.
    ///
    /// Groups are inspected bottom-up with `max_wait` per member; inspection stops at
    /// the first group with a member that is no longer running.
    pub async fn inspect(&self, max_wait: Duration) -> usize {
        for (healthy, group) in self.active.iter().enumerate() {
            let mut unhealthy = None;
            group
                .inspect(max_wait, |task| unhealthy = Some(task.name().to_string()))
                .await;

            if let Some(name) = unhealthy {
                self.bus.publish(
                    Event::new(EventKind::TaskUnhealthy)
                        .with_task(name)
                        .with_level(healthy),
                );
                return healthy;
            }
        }
        self.active.len()
    }
}

impl<T> Drop for LeveledStack<T> {
    fn drop(&mut self) {
        if let Some(listener) = &self.listener {
            listener.cancel();
        }
    }
}

impl<T> fmt::Debug for LeveledStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeveledStack")
            .field("level", &self.active.len())
            .field("dormant", &self.dormant.len())
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}
