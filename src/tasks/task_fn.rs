//! # Task functions: what a supervised worker actually runs.
//!
//! The [`TaskFunction`] trait produces a fresh future per activation. It receives a
//! one-shot [`InitAck`] and a read-only [`StopSignal`], and returns a typed outcome.
//! The common handle type is [`TaskFnRef`], an `Arc<dyn TaskFunction<T>>` that can be
//! shared between tasks, registries and tests.
//!
//! [`TaskFn`] wraps a closure `F: Fn(InitAck, StopSignal) -> Fut`.
//!
//! ## Concurrency semantics
//! - Each call to [`TaskFunction::spawn`] creates a **new** future owning its state.
//! - No hidden mutation between restarts; share state explicitly through `Arc<...>`
//!   inside the closure.
//!
//! ## Example
//! ```rust
//! use taskstack::{InitAck, StopSignal, TaskError, TaskFn, TaskFnRef};
//!
//! let f: TaskFnRef<u64> = TaskFn::arc(|ack: InitAck, stop: StopSignal| async move {
//!     ack.succeed();
//!     let mut ticks: u64 = 0;
//!     while !stop.is_set() {
//!         ticks += 1;
//!         tokio::task::yield_now().await;
//!     }
//!     Ok::<_, TaskError>(ticks)
//! });
//! # drop(f);
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::TaskError;
use crate::tasks::signals::{InitAck, StopSignal};

/// Boxed future returned by [`TaskFunction::spawn`].
pub type BoxTaskFuture<T> = BoxFuture<'static, Result<T, TaskError>>;

/// Shared handle to a task function.
pub type TaskFnRef<T> = Arc<dyn TaskFunction<T>>;

/// # Body of a supervised worker.
///
/// Implementors must call the [`InitAck`] before blocking indefinitely and should
/// watch the [`StopSignal`] to exit promptly when asked.
pub trait TaskFunction<T>: Send + Sync + 'static {
    /// Creates the future for one activation.
    fn spawn(&self, ack: InitAck, stop: StopSignal) -> BoxTaskFuture<T>;
}

/// Function-backed task function.
///
/// Wraps a closure that *creates* a new future per activation.
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Wraps a closure.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskFnRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut, T> TaskFunction<T> for TaskFn<F>
where
    F: Fn(InitAck, StopSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    fn spawn(&self, ack: InitAck, stop: StopSignal) -> BoxTaskFuture<T> {
        Box::pin((self.f)(ack, stop))
    }
}
