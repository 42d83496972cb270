//! Stack core: configuration, the leveled stack and its builder.
//!
//! - [`config`]: per-stack timeouts and bus sizing;
//! - [`stack`]: ordered groups raised and lowered with rollback;
//! - [`builder`]: wires subscribers to the stack's event bus.

mod builder;
mod config;
mod stack;

pub use builder::StackBuilder;
pub use config::{DEFAULT_ATTEMPT_TIMEOUT, StackConfig};
pub use stack::LeveledStack;
