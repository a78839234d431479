//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers (audit logs,
//! metrics, deployment-events forwarding) into an execution. Each subscriber is driven by
//! a dedicated worker fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block task actors or other subscribers.
//! - On queue overflow the event is **dropped** for that subscriber only.
//! - Subscribers observe; they cannot influence retry decisions.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use retryvisor::{Event, EventKind, Subscribe};
///
/// struct AbortCounter(std::sync::atomic::AtomicUsize);
///
/// #[async_trait]
/// impl Subscribe for AbortCounter {
///     async fn on_event(&self, ev: &Event) {
///         if ev.kind == EventKind::TaskAborted {
///             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         }
///     }
///     fn name(&self) -> &'static str { "abort-counter" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs and overflow events).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
