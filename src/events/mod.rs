//! Stack events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish
//! level transitions and member failures observed by a [`LeveledStack`](crate::LeveledStack).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `LeveledStack` (level changes, inspection), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the stack's subscriber listener (fans out to `SubscriberSet`) and
//!   any receiver obtained through `LeveledStack::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
