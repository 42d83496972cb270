//! # taskstack
//!
//! **Taskstack** brings long-running async workers up and down in stages.
//!
//! Workers are wrapped in [`SupervisedTask`]s, bundled into fate-sharing
//! [`TaskGroup`]s, and the groups are ordered in a [`LeveledStack`] whose single
//! "level" knob says how many groups, counted from the bottom, should be running.
//! Raising the level starts groups bottom-up, lowering it stops them top-down, and a
//! group that fails to transition is rolled back and halts the change.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │  LeveledStack                                                    │
//!   │  ┌──────────────┐                                                │
//!   │  │ TaskGroup #3 │ dormant     set_level(n) / inspect(max_wait)   │
//!   │  ├──────────────┤                                                │
//!   │  │ TaskGroup #2 │ dormant                                        │
//!   │  ╞══════════════╡ ◄── level = 1                                  │
//!   │  │ TaskGroup #1 │ active ──► SupervisedTask ──► TaskFunction     │
//!   │  └──────────────┘            (InitAck, StopSignal, Completion)   │
//!   └──────┬───────────────────────────────────────────────────────────┘
//!          │ publishes Events:
//!          │ - LevelChangeRequested / LevelChanged
//!          │ - GroupStarted / GroupStartFailed
//!          │ - GroupStopped / GroupStopFailed
//!          │ - TaskStartFailed / TaskStopFailed / TaskUnhealthy
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                (capacity: StackConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       │  (spawned by builder)  │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//!                         ▼         ▼         ▼
//!                     sub1.on   sub2.on   subN.on
//!                     _event()  _event()  _event()
//! ```
//!
//! ### Task lifecycle
//! ```text
//! SupervisedTask::start() ──► spawn worker(InitAck, StopSignal) ──► StartAck
//!     │                              │
//!     │                              ├─ ack(true)  ─► start succeeded
//!     │                              ├─ ack(false) ─► start rejected
//!     │                              └─ no ack     ─► timeout at the caller's deadline
//!     │
//! SupervisedTask::stop() ──► StopSignal set ──► Completion (Ok(T) / TaskError)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                             |
//! |-------------------|--------------------------------------------------------------|------------------------------------------------|
//! | **Tasks**         | Restartable workers with start handshake and stop signal.    | [`SupervisedTask`], [`TaskFn`], [`TaskFnRef`]  |
//! | **Groups**        | Fate-sharing sets with one shared deadline per operation.    | [`TaskGroup`]                                  |
//! | **Stacks**        | Ordered groups raised/lowered with rollback.                 | [`LeveledStack`], [`StackBuilder`]             |
//! | **Subscriber API**| Hook into stack events (logging, metrics, paging).           | [`Subscribe`], [`Event`]                       |
//! | **Registry**      | Build task functions by identifier from string parameters.   | [`TaskRegistry`]                               |
//! | **Errors**        | Typed errors for outcomes, failures and misuse.              | [`TaskError`], [`Failure`], [`SuperviseError`] |
//! | **Configuration** | Per-stack timeouts and bus sizing.                           | [`StackConfig`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taskstack::{InitAck, LeveledStack, StackConfig, StopSignal, SupervisedTask, TaskGroup};
//!
//! #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = StackConfig {
//!         start_timeout: Duration::from_millis(500),
//!         ..StackConfig::default()
//!     };
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskstack::Subscribe>> = {
//!         use taskstack::LogWriter;
//!         vec![Arc::new(LogWriter::default())]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskstack::Subscribe>> = Vec::new();
//!
//!     let mut stack = LeveledStack::builder(cfg).with_subscribers(subs).build();
//!
//!     for name in ["storage", "cache", "http"] {
//!         let task = SupervisedTask::new(name, |ack: InitAck, stop: StopSignal| async move {
//!             ack.succeed();
//!             stop.cancelled().await;
//!             Ok(())
//!         });
//!         stack.push_top(TaskGroup::new().with(task))?;
//!     }
//!
//!     assert_eq!(stack.set_level(3).await, 3);
//!     assert_eq!(stack.inspect(Duration::from_millis(5)).await, 3);
//!     assert_eq!(stack.set_level(1).await, 1);
//!     assert_eq!(stack.set_level(0).await, 0);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod registry;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{DEFAULT_ATTEMPT_TIMEOUT, LeveledStack, StackBuilder, StackConfig};
pub use error::{Failure, SuperviseError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use registry::{Factory, Params, TaskRegistry};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    BoxTaskFuture, Completion, InitAck, Outcome, StartAck, StopSignal, SupervisedTask, TaskFn,
    TaskFnRef, TaskFunction, TaskGroup, TaskState,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
