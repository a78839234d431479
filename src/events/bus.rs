//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] shared by every
//! publisher of an execution (task actors, attempt runner, retry scheduler).
//!
//! ```text
//! Publishers (many):                   Consumers:
//!   TaskActor  ──┐
//!   run_once   ──┼──────► Bus ───────► subscriber listener ────► SubscriberSet
//!   Scheduler  ──┤  (broadcast chan)   Execution::subscribe() receivers
//!   Execution  ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: one ring buffer for all receivers; slow receivers see
//!   `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **Observability only**: no retry decision depends on event delivery.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event; dropped silently when nobody listens.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
