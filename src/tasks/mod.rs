//! # Supervised tasks and task groups.
//!
//! This module provides the task-level building blocks:
//! - [`TaskFunction`] - trait for the body a worker runs (with [`TaskFn`] for closures)
//! - [`InitAck`], [`StopSignal`] - what the body receives
//! - [`StartAck`], [`Completion`] - what the controller receives back
//! - [`SupervisedTask`] - one named, restartable worker
//! - [`TaskGroup`] - fate-sharing set of tasks driven together

mod group;
mod signals;
mod supervised;
mod task_fn;

#[cfg(test)]
pub(crate) mod testing;

pub use group::TaskGroup;
pub use signals::{Completion, InitAck, Outcome, StartAck, StopSignal};
pub use supervised::{SupervisedTask, TaskState};
pub use task_fn::{BoxTaskFuture, TaskFn, TaskFnRef, TaskFunction};
