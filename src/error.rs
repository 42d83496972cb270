//! Error types used by supervised tasks, groups and stacks.
//!
//! This module defines three enums:
//!
//! - [`TaskError`]: the outcome of one worker activation (stored in its completion).
//! - [`Failure`]: why a member was reported through an `on_failure` callback.
//! - [`SuperviseError`]: misuse of the library or an unusable runtime.
//!
//! All of them provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` helpers.

use std::any::Any;

use thiserror::Error;

/// # Outcome errors of a single worker activation.
///
/// A `TaskError` is captured at the worker boundary and only surfaces when the
/// [`Completion`](crate::Completion) returned by
/// [`SupervisedTask::stop`](crate::SupervisedTask::stop) is awaited.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task function returned an error.
    #[error("execution failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The task function panicked; the payload was captured.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The worker vanished without reporting an outcome (runtime shut down).
    #[error("worker aborted before reporting an outcome")]
    Aborted,

    /// `stop` was called on a task that has never been started.
    #[error("task was never started")]
    NeverStarted,
}

impl TaskError {
    /// Shorthand for [`TaskError::Failed`].
    ///
    /// # Example
    /// ```
    /// use taskstack::TaskError;
    ///
    /// let err = TaskError::fail("socket closed");
    /// assert_eq!(err.as_label(), "task_failed");
    /// assert_eq!(err.to_string(), "execution failed: socket closed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failed { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Aborted => "task_aborted",
            TaskError::NeverStarted => "task_never_started",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Failed { error } => format!("error: {error}"),
            TaskError::Panicked { message } => format!("panic: {message}"),
            TaskError::Aborted => "aborted".to_string(),
            TaskError::NeverStarted => "never started".to_string(),
        }
    }
}

/// # Classification of a member reported through `on_failure`.
///
/// Groups never return errors for individual members; they invoke the caller's
/// callback and log the matching `Failure` kind.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Init acknowledgment did not arrive before the deadline.
    #[error("start acknowledgment timed out")]
    StartTimeout,

    /// Init acknowledgment arrived and reported failure.
    #[error("start rejected by task")]
    StartRejected,

    /// Worker did not complete before the stop deadline.
    #[error("stop timed out; worker still executing")]
    StopTimeout,

    /// Worker is no longer running during inspection.
    #[error("worker is not running")]
    Unhealthy,
}

impl Failure {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Failure::StartTimeout => "start_timeout",
            Failure::StartRejected => "start_rejected",
            Failure::StopTimeout => "stop_timeout",
            Failure::Unhealthy => "unhealthy",
        }
    }
}

/// # Errors produced by the supervision library itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SuperviseError {
    /// No Tokio runtime is available to spawn the worker on.
    #[error("no tokio runtime available to spawn worker for task {task:?}")]
    NoRuntime {
        /// Name of the task that failed to spawn.
        task: String,
    },

    /// A task was added to a group that has already been started once.
    #[error("group already activated; cannot add task {task:?}")]
    GroupSealed {
        /// Name of the rejected task.
        task: String,
    },

    /// A group was pushed onto a stack after its first level change.
    #[error("stack already activated; membership is fixed")]
    StackSealed,

    /// No factory is registered under the requested identifier.
    #[error("no factory registered for id {id:?}")]
    UnknownFactory {
        /// The identifier that was looked up.
        id: String,
    },

    /// A registered factory refused to build the task function.
    #[error("factory {id:?} failed: {error}")]
    Factory {
        /// The factory identifier.
        id: String,
        /// Message produced by the factory.
        error: String,
    },
}

impl SuperviseError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskstack::SuperviseError;
    ///
    /// let err = SuperviseError::UnknownFactory { id: "ticker".into() };
    /// assert_eq!(err.as_label(), "unknown_factory");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SuperviseError::NoRuntime { .. } => "no_runtime",
            SuperviseError::GroupSealed { .. } => "group_sealed",
            SuperviseError::StackSealed => "stack_sealed",
            SuperviseError::UnknownFactory { .. } => "unknown_factory",
            SuperviseError::Factory { .. } => "factory_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SuperviseError::NoRuntime { task } => format!("no runtime for task={task}"),
            SuperviseError::GroupSealed { task } => format!("group sealed; rejected task={task}"),
            SuperviseError::StackSealed => "stack sealed".to_string(),
            SuperviseError::UnknownFactory { id } => format!("unknown factory id={id}"),
            SuperviseError::Factory { id, error } => format!("factory id={id} error={error}"),
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskError::Aborted.as_label(), "task_aborted");
        assert_eq!(
            TaskError::Panicked {
                message: "boom".into()
            }
            .as_label(),
            "task_panicked"
        );
        assert_eq!(Failure::StopTimeout.as_label(), "stop_timeout");
        assert_eq!(
            SuperviseError::NoRuntime { task: "a".into() }.as_label(),
            "no_runtime"
        );
    }

    #[test]
    fn messages_carry_details() {
        assert_eq!(TaskError::fail("boom").as_message(), "error: boom");
        let err = SuperviseError::Factory {
            id: "ticker".into(),
            error: "missing period".into(),
        };
        assert_eq!(err.as_message(), "factory id=ticker error=missing period");
    }
}
