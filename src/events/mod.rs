//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Execution`, `TaskActor`, `runner::run_once`, `RetryScheduler`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the execution's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from `Execution::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
