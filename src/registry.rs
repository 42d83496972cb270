//! # Task registry: build task functions by identifier.
//!
//! [`TaskRegistry`] maps string identifiers to factories producing [`TaskFnRef`]s from
//! string parameters, so stacks can be assembled from configuration:
//!
//! ```text
//! config: { name: "poller", kind: "ticker", params: { period_ms: "50" } }
//!                               │
//! registry.build_task("poller", "ticker", &params)
//!     ├─► factory lookup by id ── missing ─► SuperviseError::UnknownFactory
//!     ├─► factory(&params) ────── Err ─────► SuperviseError::Factory
//!     └─► SupervisedTask::with_function(name, func)
//! ```
//!
//! Registering an identifier twice replaces the earlier factory.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::SuperviseError;
use crate::tasks::{SupervisedTask, TaskFnRef};

/// String parameters handed to a factory.
pub type Params = HashMap<String, String>;

/// Factory building a task function from parameters.
pub type Factory<T> = Arc<dyn Fn(&Params) -> Result<TaskFnRef<T>, String> + Send + Sync>;

/// Identifier-keyed collection of task factories.
///
/// # Example
/// ```rust
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use taskstack::{InitAck, StopSignal, TaskError, TaskFn, TaskRegistry};
///
/// let mut registry: TaskRegistry = TaskRegistry::new();
/// registry.register("ticker", |params| {
///     let period: u64 = params
///         .get("period_ms")
///         .ok_or("missing period_ms")?
///         .parse()
///         .map_err(|e| format!("bad period_ms: {e}"))?;
///     Ok(TaskFn::arc(move |ack: InitAck, stop: StopSignal| async move {
///         ack.succeed();
///         while !stop.is_set() {
///             tokio::time::sleep(Duration::from_millis(period)).await;
///         }
///         Ok::<(), TaskError>(())
///     }))
/// });
///
/// let params = HashMap::from([("period_ms".to_string(), "50".to_string())]);
/// let task = registry.build_task("poller", "ticker", &params).unwrap();
/// assert_eq!(task.name(), "poller");
/// assert!(registry.build_task("poller", "ticker", &HashMap::new()).is_err());
/// ```
pub struct TaskRegistry<T = ()> {
    factories: BTreeMap<String, Factory<T>>,
}

impl<T> Default for TaskRegistry<T> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<T> TaskRegistry<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `id`, replacing any previous one.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Params) -> Result<TaskFnRef<T>, String> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.insert(id.clone(), Arc::new(factory)).is_some() {
            tracing::debug!(%id, "factory replaced");
        }
        self
    }

    /// True if a factory is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds a task function with the factory registered under `id`.
    ///
    /// ### Errors
    /// - [`SuperviseError::UnknownFactory`] when nothing is registered under `id`;
    /// - [`SuperviseError::Factory`] when the factory rejects `params`.
    pub fn create(&self, id: &str, params: &Params) -> Result<TaskFnRef<T>, SuperviseError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| SuperviseError::UnknownFactory { id: id.to_string() })?;
        factory(params).map_err(|error| SuperviseError::Factory {
            id: id.to_string(),
            error,
        })
    }

    /// Builds a named supervised task around the function created by `id`.
    pub fn build_task(
        &self,
        name: impl Into<Arc<str>>,
        id: &str,
        params: &Params,
    ) -> Result<SupervisedTask<T>, SuperviseError> {
        let func = self.create(id, params)?;
        Ok(SupervisedTask::with_function(name, func))
    }
}

impl<T> fmt::Debug for TaskRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
