//! # SupervisedTask: one named worker with start/stop/liveness control.
//!
//! A [`SupervisedTask`] owns at most one live worker (a Tokio task) at a time and
//! drives it through explicit activations:
//!
//! ```text
//!  Idle ──start()──► Active ──stop()──► Stopping ──worker exits──► Terminated
//!   ▲                  │                                              │
//!   │                  └──────── worker exits on its own ─────────────┤
//!   └──────────────────── start() joins the old handle ◄──────────────┘
//! ```
//!
//! ## Rules
//! - `start()` **joins** the previous worker handle before spawning a new one. If the
//!   previous worker ignores its stop signal, `start()` waits for it.
//! - Each activation gets a fresh [`StopSignal`], [`StartAck`] and [`Completion`];
//!   nothing is reused across runs.
//! - `stop()` only *requests* shutdown. It is idempotent and returns the current
//!   activation's completion (clones share one outcome).
//! - Errors and panics of the task function are captured at the worker boundary and
//!   surface only through the [`Completion`].
//! - Single controller: a task is driven from one place at a time (`&mut self` on
//!   `start`). Calling `start()` while a worker is active is not a supported transition.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{SuperviseError, TaskError, panic_message};
use crate::tasks::signals::{Completion, InitAck, StartAck, StopSignal};
use crate::tasks::task_fn::{TaskFn, TaskFnRef};

/// Observable lifecycle state of a [`SupervisedTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No worker spawned yet.
    Idle,
    /// Worker spawned, no stop requested.
    Active,
    /// Stop requested, worker still executing.
    Stopping,
    /// Worker exited; its handle is joined on the next `start()`.
    Terminated,
}

/// Named, restartable worker under explicit controller supervision.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use taskstack::{InitAck, StopSignal, SupervisedTask};
///
/// #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut task = SupervisedTask::new("echo", |ack: InitAck, stop: StopSignal| async move {
///         ack.succeed();
///         stop.cancelled().await;
///         Ok(())
///     });
///
///     let started = task.start().await?;
///     started.wait_for(Duration::from_millis(100)).await?;
///     assert!(task.still_running(Duration::from_millis(5)).await);
///
///     task.stop().await?;
///     assert!(!task.still_running(Duration::from_millis(5)).await);
///     Ok(())
/// }
/// ```
pub struct SupervisedTask<T = ()> {
    name: Arc<str>,
    func: TaskFnRef<T>,
    worker: Option<JoinHandle<()>>,
    stop: CancellationToken,
    completion: Option<Completion<T>>,
}

impl<T> SupervisedTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a task from a closure `Fn(InitAck, StopSignal) -> Future`.
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(InitAck, StopSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self::with_function(name, TaskFn::arc(f))
    }

    /// Creates a task from a shared task function handle.
    pub fn with_function(name: impl Into<Arc<str>>, func: TaskFnRef<T>) -> Self {
        Self {
            name: name.into(),
            func,
            worker: None,
            stop: CancellationToken::new(),
            completion: None,
        }
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> TaskState {
        match (&self.worker, &self.completion) {
            (None, _) | (_, None) => TaskState::Idle,
            (Some(worker), Some(done)) if worker.is_finished() || done.is_finished() => {
                TaskState::Terminated
            }
            (Some(_), Some(_)) if self.stop.is_cancelled() => TaskState::Stopping,
            (Some(_), Some(_)) => TaskState::Active,
        }
    }

    /// Spawns a new activation and returns its init acknowledgment future.
    ///
    /// ### Flow
    /// 1. Join the previous worker handle, if any (waits for it to exit)
    /// 2. Install a fresh stop signal, start ack and completion
    /// 3. Spawn the worker running the task function
    ///
    /// ### Errors
    /// [`SuperviseError::NoRuntime`] when no Tokio runtime is available to spawn on.
    pub async fn start(&mut self) -> Result<StartAck, SuperviseError> {
        let rt = Handle::try_current().map_err(|_| SuperviseError::NoRuntime {
            task: self.name.to_string(),
        })?;

        if let Some(prev) = self.worker.take() {
            if !prev.is_finished() {
                tracing::debug!(task = %self.name, "joining previous worker before restart");
            }
            // The outcome already lives in the completion.
            let _ = prev.await;
        }

        self.stop = CancellationToken::new();
        let (ack, started) = InitAck::channel();
        let (done_tx, completion) = Completion::channel();
        let signal = StopSignal::new(self.stop.clone());

        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| self.func.spawn(ack, signal)))
        {
            Ok(fut) => fut,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!(task = %self.name, %message, "task function panicked before spawn");
                self.completion = Some(Completion::ready(Err(TaskError::Panicked { message })));
                self.worker = Some(rt.spawn(async {}));
                return Ok(started);
            }
        };

        let name = Arc::clone(&self.name);
        let worker = rt.spawn(async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(panic) => Err(TaskError::Panicked {
                    message: panic_message(panic.as_ref()),
                }),
            };
            match &outcome {
                Ok(_) => tracing::debug!(task = %name, "worker exited"),
                Err(e) => tracing::debug!(task = %name, error = %e, "worker exited with error"),
            }
            let _ = done_tx.send(outcome);
        });

        tracing::debug!(task = %self.name, "worker spawned");
        self.worker = Some(worker);
        self.completion = Some(completion);
        Ok(started)
    }

    /// Requests cooperative shutdown and returns the activation's completion.
    ///
    /// Never terminates the worker forcibly. Calling it again returns a handle to the
    /// same in-flight (or already resolved) completion. Before the first `start()` it
    /// returns a completion resolved to [`TaskError::NeverStarted`].
    pub fn stop(&self) -> Completion<T> {
        self.stop.cancel();
        match &self.completion {
            Some(done) => done.clone(),
            None => Completion::ready(Err(TaskError::NeverStarted)),
        }
    }

    /// Returns `true` if the worker has not completed within `timeout`.
    ///
    /// A finished worker (successful or not) yields `false`. The outcome is never
    /// consumed by this call.
    pub async fn still_running(&self, timeout: Duration) -> bool {
        match &self.completion {
            Some(done) => done.wait_for(timeout).await.is_none(),
            None => false,
        }
    }

    /// Returns the current activation's completion without requesting a stop.
    pub fn completion(&self) -> Option<Completion<T>> {
        self.completion.clone()
    }
}

impl<T> Drop for SupervisedTask<T> {
    fn drop(&mut self) {
        if let Some(worker) = &self.worker {
            if !worker.is_finished() {
                tracing::debug!(task = %self.name, "task dropped; requesting worker stop");
                self.stop.cancel();
            }
        }
    }
}

impl<T> fmt::Debug for SupervisedTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedTask")
            .field("name", &self.name)
            .field("has_worker", &self.worker.is_some())
            .field("stop_requested", &self.stop.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;
    use crate::tasks::testing::Probe;

    const ACK_WAIT: Duration = Duration::from_millis(500);
    const STOP_WAIT: Duration = Duration::from_millis(500);

    #[test]
    fn construct() {
        let task = Probe::default().task("my_named_task");
        assert_eq!(task.name(), "my_named_task");
        assert_eq!(task.state(), TaskState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_successful() {
        let mut task = Probe::default().task("t");
        let started = task.start().await.unwrap();
        assert_eq!(started.wait_for(ACK_WAIT).await, Ok(()));
        assert_eq!(task.state(), TaskState::Active);
        task.stop().wait_for(STOP_WAIT).await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_failure() {
        let mut task = Probe::default().reject_start().task("t");
        let started = task.start().await.unwrap();
        assert_eq!(started.wait_for(ACK_WAIT).await, Err(Failure::StartRejected));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_timeout_with_run() {
        let probe = Probe::default().never_ack();
        let mut task = probe.task("t");
        let started = task.start().await.unwrap();
        assert_eq!(
            started.wait_for(Duration::from_millis(50)).await,
            Err(Failure::StartTimeout)
        );
        // Liveness still reflects the worker itself.
        assert!(task.still_running(Duration::from_millis(10)).await);
        task.stop().wait_for(STOP_WAIT).await.unwrap().unwrap();
        assert!(!task.still_running(Duration::from_millis(10)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_timeout_no_run() {
        let mut task = Probe::default().never_ack().reject_start().task("t");
        let started = task.start().await.unwrap();
        assert_eq!(
            started.wait_for(Duration::from_millis(50)).await,
            Err(Failure::StartTimeout)
        );
        assert!(!task.still_running(Duration::from_millis(50)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_successful() {
        let mut task = Probe::default().task("t");
        assert!(task.start().await.unwrap().await);
        let outcome = task.stop().wait_for(STOP_WAIT).await;
        assert_eq!(outcome, Some(Ok(())));
        assert_eq!(task.state(), TaskState::Terminated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn self_exited_worker_is_terminated_without_awaiting() {
        let mut task = Probe::default().run_for(Duration::ZERO).task("t");
        assert_eq!(task.start().await.unwrap().wait_for(ACK_WAIT).await, Ok(()));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(task.state(), TaskState::Terminated);
        let done = task.completion().unwrap();
        assert!(done.is_finished());
        assert_eq!(done.peek(), Some(&Ok(())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stopped_worker_is_terminated_without_awaiting() {
        let mut task = Probe::default().task("t");
        assert!(task.start().await.unwrap().await);
        let _ = task.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(task.state(), TaskState::Terminated);
        assert!(task.completion().unwrap().is_finished());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn error_is_deferred_into_completion() {
        let mut task = Probe::default().fail_on_exit().task("t");
        assert!(task.start().await.unwrap().await);
        let outcome = task.stop().wait_for(STOP_WAIT).await;
        assert_eq!(outcome, Some(Err(TaskError::fail("probe exit failure"))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panic_is_captured() {
        let mut task: SupervisedTask<()> =
            SupervisedTask::new("panicky", |ack: InitAck, _stop: StopSignal| async move {
                ack.succeed();
                panic!("boom");
            });
        assert!(task.start().await.unwrap().await);
        let outcome = task.stop().wait_for(STOP_WAIT).await;
        assert_eq!(
            outcome,
            Some(Err(TaskError::Panicked {
                message: "boom".into()
            }))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_timeout() {
        let probe = Probe::default().holding();
        let mut task = probe.task("t");
        assert!(task.start().await.unwrap().await);

        let done = task.stop();
        assert!(done.wait_for(Duration::from_millis(50)).await.is_none());
        assert_eq!(task.state(), TaskState::Stopping);

        probe.release();
        assert_eq!(done.wait_for(STOP_WAIT).await, Some(Ok(())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn still_running_true() {
        let mut task = Probe::default().task("t");
        assert!(task.start().await.unwrap().await);
        assert!(task.still_running(Duration::from_millis(50)).await);
        task.stop().wait_for(STOP_WAIT).await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn still_running_false_keeps_error() {
        let mut task = Probe::default()
            .run_for(Duration::from_millis(10))
            .fail_on_exit()
            .task("t");
        assert!(task.start().await.unwrap().await);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!task.still_running(Duration::from_millis(10)).await);
        assert!(!task.still_running(Duration::from_millis(10)).await);
        assert_eq!(
            task.stop().await,
            Err(TaskError::fail("probe exit failure"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_is_idempotent() {
        let probe = Probe::default();
        let mut task = probe.task("t");
        assert!(task.start().await.unwrap().await);

        let first = task.stop();
        let second = task.stop();
        assert!(first.same_activation(&second));
        assert_eq!(first.wait_for(STOP_WAIT).await, Some(Ok(())));
        assert_eq!(second.await, Ok(()));
        assert_eq!(task.stop().await, Ok(()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_and_restart_yields_fresh_completions() {
        let probe = Probe::default();
        let mut task = probe.task("t");

        assert!(task.start().await.unwrap().await);
        let first = task.stop();
        assert_eq!(first.wait_for(STOP_WAIT).await, Some(Ok(())));

        assert!(task.start().await.unwrap().await);
        assert_eq!(task.state(), TaskState::Active);
        let second = task.stop();
        assert!(!first.same_activation(&second));
        assert_eq!(second.wait_for(STOP_WAIT).await, Some(Ok(())));
    }

    #[tokio::test]
    async fn stop_before_start() {
        let task = Probe::default().task("t");
        assert_eq!(task.stop().await, Err(TaskError::NeverStarted));
        assert!(!task.still_running(Duration::from_millis(1)).await);
    }

    #[test]
    fn start_without_runtime_fails() {
        let mut task = Probe::default().task("t");
        let res = futures::executor::block_on(task.start());
        assert!(matches!(res, Err(SuperviseError::NoRuntime { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn typed_outcome() {
        let mut task = SupervisedTask::new("count", |ack: InitAck, stop: StopSignal| async move {
            ack.succeed();
            stop.cancelled().await;
            Ok::<_, TaskError>(42u32)
        });
        assert!(task.start().await.unwrap().await);
        assert_eq!(task.stop().await, Ok(42));
    }
}
