//! Configurable task function shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::error::TaskError;
use crate::tasks::{InitAck, StopSignal, SupervisedTask};

/// Knobs controlling how a probe worker behaves.
#[derive(Clone)]
pub(crate) struct Probe {
    /// Never call the init ack.
    pub timeout_start: bool,
    /// Value passed to the init ack.
    pub succeed_start: bool,
    /// Keep running (ignoring the stop signal) while this flag is set.
    pub hold: Arc<AtomicBool>,
    /// Return an error when exiting.
    pub fail_on_exit: bool,
    /// Run at most this long once started.
    pub run_for: Duration,
    /// Incremented once per loop iteration.
    pub laps: Arc<AtomicUsize>,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            timeout_start: false,
            succeed_start: true,
            hold: Arc::new(AtomicBool::new(false)),
            fail_on_exit: false,
            run_for: Duration::from_secs(60),
            laps: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Probe {
    pub fn run_for(mut self, d: Duration) -> Self {
        self.run_for = d;
        self
    }

    pub fn reject_start(mut self) -> Self {
        self.succeed_start = false;
        self
    }

    pub fn never_ack(mut self) -> Self {
        self.timeout_start = true;
        self
    }

    pub fn fail_on_exit(mut self) -> Self {
        self.fail_on_exit = true;
        self
    }

    pub fn holding(self) -> Self {
        self.hold.store(true, Ordering::SeqCst);
        self
    }

    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
    }

    pub fn laps(&self) -> usize {
        self.laps.load(Ordering::SeqCst)
    }

    pub fn task(&self, name: &str) -> SupervisedTask<()> {
        let probe = self.clone();
        SupervisedTask::new(name, move |ack: InitAck, stop: StopSignal| {
            let probe = probe.clone();
            async move {
                let ack = if probe.timeout_start {
                    Some(ack)
                } else {
                    ack.ack(probe.succeed_start);
                    None
                };
                if probe.succeed_start {
                    let exit_at = Instant::now() + probe.run_for;
                    while (Instant::now() < exit_at && !stop.is_set())
                        || probe.hold.load(Ordering::SeqCst)
                    {
                        probe.laps.fetch_add(1, Ordering::SeqCst);
                        time::sleep(Duration::from_millis(1)).await;
                    }
                }
                drop(ack);
                if probe.fail_on_exit {
                    return Err(TaskError::fail("probe exit failure"));
                }
                Ok(())
            }
        })
    }
}
