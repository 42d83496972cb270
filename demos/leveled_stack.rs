//! # Example: leveled_stack
//!
//! Brings a three-level service stack up and down, with one level that refuses to start.
//!
//! Shows how to:
//! - Register task factories in a [`TaskRegistry`] and build tasks from parameters
//! - Bundle tasks into [`TaskGroup`]s and order them in a [`LeveledStack`]
//! - Watch level changes through the built-in [`LogWriter`] subscriber
//! - Detect a crashed worker with [`LeveledStack::inspect`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► level 1: storage (ticker)
//!   ├─► level 2: cache (ticker) + indexer (ticker, exits after 300ms)
//!   ├─► level 3: frontend (rejects startup)
//!   │
//!   ├─► set_level(3) ─► reaches 2, frontend rolled back
//!   ├─► inspect()    ─► 2, then 1 once the indexer has exited
//!   └─► set_level(0) ─► everything stopped top-down
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example leveled_stack --features logging
//! ```

use std::{sync::Arc, time::Duration};

use taskstack::{
    InitAck, LeveledStack, LogWriter, Params, StackConfig, StopSignal, Subscribe, TaskError,
    TaskFn, TaskGroup, TaskRegistry,
};
use tracing_subscriber::EnvFilter;

fn registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register("ticker", |params: &Params| {
        let period = params
            .get("period_ms")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| format!("bad period_ms: {e}"))?
            .unwrap_or(100);
        let lifetime = params
            .get("exit_after_ms")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| format!("bad exit_after_ms: {e}"))?;

        Ok(TaskFn::arc(move |ack: InitAck, stop: StopSignal| async move {
            ack.succeed();
            let started = tokio::time::Instant::now();
            while !stop.is_set() {
                if lifetime.is_some_and(|ms| started.elapsed() >= Duration::from_millis(ms)) {
                    return Err(TaskError::fail("lifetime elapsed"));
                }
                tokio::time::sleep(Duration::from_millis(period)).await;
            }
            Ok(())
        }))
    });
    registry.register("rejecting", |_: &Params| {
        Ok(TaskFn::arc(|ack: InitAck, _stop: StopSignal| async move {
            ack.fail();
            Ok::<(), TaskError>(())
        }))
    });
    registry
}

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Configure the stack
    let cfg = StackConfig {
        start_timeout: Duration::from_millis(500),
        stop_timeout: Duration::from_millis(500),
        ..StackConfig::default()
    };

    // 2. Subscribers
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut stack = LeveledStack::builder(cfg).with_subscribers(subs).build();

    // 3. Build groups from the registry, bottom-up
    let registry = registry();
    let fast = params(&[("period_ms", "20")]);

    stack.push_top(TaskGroup::new().with(registry.build_task("storage", "ticker", &fast)?))?;
    stack.push_top(
        TaskGroup::new()
            .with(registry.build_task("cache", "ticker", &fast)?)
            .with(registry.build_task(
                "indexer",
                "ticker",
                &params(&[("period_ms", "20"), ("exit_after_ms", "300")]),
            )?),
    )?;
    stack.push_top(TaskGroup::new().with(registry.build_task(
        "frontend",
        "rejecting",
        &Params::new(),
    )?))?;

    // 4. Raise as far as possible
    let level = stack.set_level(3).await;
    println!("requested level 3, reached {level} of {}", stack.depth());

    println!("healthy levels: {}", stack.inspect(Duration::from_millis(10)).await);
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!(
        "healthy levels after indexer exit: {}",
        stack.inspect(Duration::from_millis(10)).await
    );

    // 5. Shut everything down
    let level = stack.set_level(0).await;
    println!("lowered to level {level}");

    // Give the subscriber workers a moment to flush.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
