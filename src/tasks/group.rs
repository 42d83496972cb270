//! # TaskGroup: fate-sharing set of supervised tasks.
//!
//! A [`TaskGroup`] starts, stops and inspects its members as one unit. Start and stop
//! fan out to **all** members concurrently and share a **single deadline**, so the
//! whole operation is bounded by `max_wait` regardless of the member count:
//!
//! ```text
//!   deadline = now + max_wait
//!      │
//!      ├──► member[0].start() ──► wait_until(deadline) ──┐
//!      ├──► member[1].start() ──► wait_until(deadline) ──┼──► on_failure(member) for each miss
//!      └──► member[N].start() ──► wait_until(deadline) ──┘
//! ```
//!
//! ## Rules
//! - Members are added only before the first `start()` (`with` panics, `add` and
//!   `try_with` return `GroupSealed`).
//! - Individual failures never abort the operation; they are reported through
//!   `on_failure` in member order. Rolling back is the caller's decision.
//! - Because the deadline is shared, a member resolved later gets less slack.
//! - `inspect` walks members in order and **stops at the first** one that is not
//!   running, returning how many healthy members preceded it.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::error::{Failure, SuperviseError};
use crate::tasks::supervised::SupervisedTask;

/// Ordered collection of supervised tasks managed together.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use taskstack::{InitAck, StopSignal, SupervisedTask, TaskGroup};
///
/// #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut group = TaskGroup::new();
///     for name in ["reader", "writer"] {
///         group.add(SupervisedTask::new(name, |ack: InitAck, stop: StopSignal| async move {
///             ack.succeed();
///             stop.cancelled().await;
///             Ok(())
///         }))?;
///     }
///
///     let mut failed = Vec::new();
///     group.start(Duration::from_millis(200), |t| failed.push(t.name().to_string())).await;
///     assert!(failed.is_empty());
///
///     assert_eq!(group.inspect(Duration::from_millis(1), |_| {}).await, 2);
///     group.stop(Duration::from_millis(200), |t| failed.push(t.name().to_string())).await;
///     assert!(failed.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct TaskGroup<T = ()> {
    tasks: Vec<SupervisedTask<T>>,
    sealed: bool,
}

impl<T> Default for TaskGroup<T> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            sealed: false,
        }
    }
}

impl<T> TaskGroup<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task.
    ///
    /// ### Errors
    /// [`SuperviseError::GroupSealed`] once the group has been started.
    pub fn add(&mut self, task: SupervisedTask<T>) -> Result<(), SuperviseError> {
        if self.sealed {
            return Err(SuperviseError::GroupSealed {
                task: task.name().to_string(),
            });
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Builder-style [`TaskGroup::add`] for assembling a group before activation.
    ///
    /// # Panics
    /// If the group has already been started; use [`TaskGroup::try_with`] to get
    /// [`SuperviseError::GroupSealed`] instead.
    pub fn with(mut self, task: SupervisedTask<T>) -> Self {
        assert!(
            !self.sealed,
            "group already activated; cannot add task {:?}",
            task.name()
        );
        self.tasks.push(task);
        self
    }

    /// Fallible builder-style [`TaskGroup::add`].
    ///
    /// ### Errors
    /// [`SuperviseError::GroupSealed`] once the group has been started.
    pub fn try_with(mut self, task: SupervisedTask<T>) -> Result<Self, SuperviseError> {
        self.add(task)?;
        Ok(self)
    }

    /// Number of member tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Member names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Iterates over members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SupervisedTask<T>> {
        self.tasks.iter()
    }

    /// Starts every member concurrently and reports members that did not come up.
    ///
    /// A member is reported when its init acknowledgment is negative, when it does
    /// not arrive before `now + max_wait`, or when the worker could not be spawned.
    /// Reported members are **not** stopped here.
    pub async fn start<R>(&mut self, max_wait: Duration, mut on_failure: R)
    where
        R: FnMut(&SupervisedTask<T>),
    {
        self.sealed = true;
        let deadline = Instant::now() + max_wait;

        let results = join_all(self.tasks.iter_mut().map(|task| async move {
            match task.start().await {
                Ok(started) => started.wait_until(deadline).await,
                Err(e) => {
                    tracing::warn!(task = %task.name(), error = %e, "failed to spawn worker");
                    Err(Failure::StartRejected)
                }
            }
        }))
        .await;

        for (task, res) in self.tasks.iter().zip(results) {
            if let Err(failure) = res {
                tracing::warn!(task = %task.name(), failure = failure.as_label(), "task failed to start");
                on_failure(task);
            }
        }
    }

    /// Signals every member to stop and reports members still executing at the deadline.
    pub async fn stop<R>(&mut self, max_wait: Duration, mut on_failure: R)
    where
        R: FnMut(&SupervisedTask<T>),
    {
        let deadline = Instant::now() + max_wait;
        let pending: Vec<_> = self.tasks.iter().map(|task| task.stop()).collect();

        let results = join_all(pending.iter().map(|done| done.wait_until(deadline))).await;

        for (task, res) in self.tasks.iter().zip(results) {
            match res {
                None => {
                    tracing::warn!(
                        task = %task.name(),
                        failure = Failure::StopTimeout.as_label(),
                        "task did not stop in time"
                    );
                    on_failure(task);
                }
                Some(Err(e)) => {
                    tracing::debug!(task = %task.name(), error = %e, "task stopped with error");
                }
                Some(Ok(_)) => {}
            }
        }
    }

    /// Checks members in order and returns the number of running members before the
    /// first one that is not running.
    ///
    /// Only that first unhealthy member is reported; members after it are not checked.
    /// Returns [`TaskGroup::len`] when every member is running.
    pub async fn inspect<R>(&self, max_wait: Duration, mut on_failure: R) -> usize
    where
        R: FnMut(&SupervisedTask<T>),
    {
        for (depth, task) in self.tasks.iter().enumerate() {
            if !task.still_running(max_wait).await {
                tracing::debug!(
                    task = %task.name(),
                    failure = Failure::Unhealthy.as_label(),
                    depth,
                    "inspection found a stopped task"
                );
                on_failure(task);
                return depth;
            }
        }
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::testing::Probe;

    fn collect() -> (
        std::sync::Arc<std::sync::Mutex<Vec<String>>>,
        impl FnMut(&SupervisedTask<()>) + Clone,
    ) {
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = sink.clone();
        (sink, move |t: &SupervisedTask<()>| {
            s.lock().unwrap().push(t.name().to_string())
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simple_task_runs_across_restart() {
        let probe = Probe::default();
        let mut group = TaskGroup::new();
        group.add(probe.task("my_simple_task")).unwrap();

        let (failures, report) = collect();
        group.start(Duration::from_millis(200), report.clone()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        group.stop(Duration::from_millis(200), report.clone()).await;
        let first_run = probe.laps();
        assert!(first_run > 0);

        group.start(Duration::from_millis(200), report.clone()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        group.stop(Duration::from_millis(200), report).await;
        assert!(probe.laps() > first_run);
        assert!(failures.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fail_to_start_a_single_task() {
        let mut group = TaskGroup::new();
        group.add(Probe::default().reject_start().task("my_simple_task")).unwrap();

        let (failures, report) = collect();
        group.start(Duration::from_millis(50), report).await;
        assert_eq!(*failures.lock().unwrap(), vec!["my_simple_task"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fail_to_start_one_out_of_two() {
        let mut group = TaskGroup::new()
            .with(Probe::default().reject_start().task("task_1"))
            .with(Probe::default().task("task_2"));

        let (failures, report) = collect();
        group.start(Duration::from_millis(50), report.clone()).await;
        assert_eq!(*failures.lock().unwrap(), vec!["task_1"]);

        // task_2 is not rolled back by the group.
        assert!(group.tasks[1].still_running(Duration::from_millis(5)).await);
        group.stop(Duration::from_millis(200), report).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_is_bounded_by_one_deadline() {
        let mut group = TaskGroup::new();
        for i in 0..8 {
            group.add(Probe::default().never_ack().task(&format!("slow_{i}"))).unwrap();
        }

        let (failures, report) = collect();
        let began = std::time::Instant::now();
        group.start(Duration::from_millis(100), report.clone()).await;
        let took = began.elapsed();

        assert_eq!(failures.lock().unwrap().len(), 8);
        assert!(took < Duration::from_millis(400), "took {took:?}");
        group.stop(Duration::from_millis(500), report).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_reports_stuck_members() {
        let stuck = Probe::default().holding();
        let mut group = TaskGroup::new()
            .with(stuck.task("stuck"))
            .with(Probe::default().task("fine"));

        let (failures, report) = collect();
        group.start(Duration::from_millis(200), report.clone()).await;
        group.stop(Duration::from_millis(50), report).await;
        assert_eq!(*failures.lock().unwrap(), vec!["stuck"]);
        stuck.release();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exited_task_fails_inspection() {
        let mut group = TaskGroup::new();
        group
            .add(Probe::default().run_for(Duration::from_millis(10)).task("short"))
            .unwrap();

        let (failures, report) = collect();
        group.start(Duration::from_millis(100), report.clone()).await;
        assert!(failures.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(group.inspect(Duration::from_millis(1), report).await, 0);
        assert_eq!(*failures.lock().unwrap(), vec!["short"]);
    }

    /// Inspection stops at the first unhealthy member and does not aggregate.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn inspect_short_circuits_at_first_unhealthy() {
        let mut group = TaskGroup::new()
            .with(Probe::default().task("healthy"))
            .with(Probe::default().run_for(Duration::ZERO).task("gone_1"))
            .with(Probe::default().run_for(Duration::ZERO).task("gone_2"));

        let (failures, report) = collect();
        group.start(Duration::from_millis(100), report.clone()).await;
        assert!(failures.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(group.inspect(Duration::from_millis(1), report.clone()).await, 1);
        assert_eq!(*failures.lock().unwrap(), vec!["gone_1"]);
        group.stop(Duration::from_millis(200), report).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn add_after_start_is_rejected() {
        let mut group = TaskGroup::new();
        group.add(Probe::default().task("first")).unwrap();
        group.start(Duration::from_millis(100), |_| {}).await;

        let err = group.add(Probe::default().task("late")).unwrap_err();
        assert!(matches!(err, SuperviseError::GroupSealed { task } if task == "late"));
        assert_eq!(group.names(), vec!["first"]);
        group.stop(Duration::from_millis(200), |_| {}).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn try_with_after_start_is_rejected() {
        let mut group = TaskGroup::new().with(Probe::default().task("first"));
        group.start(Duration::from_millis(100), |_| {}).await;

        let err = group.try_with(Probe::default().task("late")).unwrap_err();
        assert!(matches!(err, SuperviseError::GroupSealed { task } if task == "late"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[should_panic(expected = "group already activated")]
    async fn with_after_start_panics() {
        let mut group = TaskGroup::new().with(Probe::default().task("first"));
        group.start(Duration::from_millis(100), |_| {}).await;
        let _ = group.with(Probe::default().task("late"));
    }
}
