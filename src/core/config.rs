//! # Leveled stack configuration.
//!
//! Provides [`StackConfig`], the settings a [`LeveledStack`](crate::LeveledStack)
//! applies to every level change.
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → default (1s) per promotion attempt
//! - `stop_timeout = 0s` → default (1s) per demotion attempt
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Per-attempt timeout used when no explicit one is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a leveled stack.
///
/// ## Field semantics
/// - `start_timeout`: shared deadline for one group to acknowledge startup
/// - `stop_timeout`: shared deadline for one group to finish after stop is requested
/// - `bus_capacity`: event bus ring buffer size
///
/// All fields are public. Prefer the accessors to avoid sprinkling sentinel checks.
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// Maximum wait for a group's members to acknowledge startup.
    ///
    /// If any member misses it (or rejects), the group goes back to the dormant side.
    pub start_timeout: Duration,

    /// Maximum wait for a group's members to finish after stop is requested.
    ///
    /// If any member misses it, the group stays on the active side.
    pub stop_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl StackConfig {
    /// Effective start timeout (`0s` means default).
    #[inline]
    pub fn start_timeout(&self) -> Duration {
        non_zero_or_default(self.start_timeout)
    }

    /// Effective stop timeout (`0s` means default).
    #[inline]
    pub fn stop_timeout(&self) -> Duration {
        non_zero_or_default(self.stop_timeout)
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for StackConfig {
    /// Default configuration:
    ///
    /// - `start_timeout = 1s`
    /// - `stop_timeout = 1s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            stop_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            bus_capacity: 1024,
        }
    }
}

fn non_zero_or_default(d: Duration) -> Duration {
    if d == Duration::ZERO {
        DEFAULT_ATTEMPT_TIMEOUT
    } else {
        d
    }
}
