//! # StackBuilder: wires subscribers to a leveled stack.
//!
//! ```text
//! StackBuilder::build()
//!     ├─► Bus::new(bus_capacity)
//!     ├─ no subscribers ─► LeveledStack (bus only; receivers via subscribe())
//!     └─ subscribers ─────► SubscriberSet::new(subs, bus)
//!                           spawn listener: Bus ─► SubscriberSet::emit(&Event)
//!                           LeveledStack holds the listener token
//! ```
//!
//! The listener skips lagged events with a warning and exits once the stack is
//! dropped, flushing what is still buffered to the subscribers first.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{config::StackConfig, stack::LeveledStack},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`LeveledStack`] with optional subscribers.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use taskstack::{Event, LeveledStack, StackConfig, Subscribe};
///
/// struct Counter;
///
/// #[async_trait]
/// impl Subscribe for Counter {
///     async fn on_event(&self, _ev: &Event) {}
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Counter)];
///     let stack: LeveledStack = LeveledStack::builder(StackConfig::default())
///         .with_subscribers(subs)
///         .build();
///     assert_eq!(stack.level(), 0);
/// }
/// ```
pub struct StackBuilder {
    cfg: StackConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl StackBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: StackConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive every stack event through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the stack.
    ///
    /// With subscribers configured this spawns the subscriber workers and a listener
    /// forwarding the bus to them, so it must be called from within a Tokio runtime.
    /// The listener ends when the stack is dropped.
    pub fn build<T>(self) -> LeveledStack<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        if self.subscribers.is_empty() {
            return LeveledStack::from_parts(self.cfg, bus, None);
        }

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let token = CancellationToken::new();
        subscriber_listener(&bus, subs, token.clone());
        LeveledStack::from_parts(self.cfg, bus, Some(token))
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                _ = token.cancelled() => break,
                ev = rx.recv() => ev,
            };
            match ev {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            subs.emit(&ev);
        }
        subs.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use crate::tasks::{TaskGroup, testing::Probe};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Forward {
        tx: mpsc::UnboundedSender<EventKind>,
    }

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, ev: &Event) {
            let _ = self.tx.send(ev.kind);
        }

        fn name(&self) -> &'static str {
            "forward"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn subscribers_observe_level_changes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Forward { tx })];
        let mut stack: LeveledStack = StackBuilder::new(StackConfig::default())
            .with_subscribers(subs)
            .build();
        stack
            .push_top(TaskGroup::new().with(Probe::default().task("only")))
            .unwrap();

        assert_eq!(stack.set_level(1).await, 1);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let kind = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(kind);
        }
        assert_eq!(
            seen,
            vec![
                EventKind::LevelChangeRequested,
                EventKind::GroupStarted,
                EventKind::LevelChanged,
            ]
        );
        stack.set_level(0).await;
    }

    #[tokio::test]
    async fn builds_without_subscribers() {
        let stack: LeveledStack<u8> = StackBuilder::new(StackConfig::default()).build();
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.config().bus_capacity, 1024);
    }
}
