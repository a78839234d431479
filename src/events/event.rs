//! # Runtime events emitted by executions, task actors and the retry scheduler.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Attempt events**: one invocation (starting, succeeded, failed, timeout)
//! - **Retry events**: scheduling and cancellation of delayed re-submission
//! - **Terminal events**: the task's final status (succeeded, aborted, cancelled)
//! - **Runtime events**: execution cancellation and subscriber health
//!
//! The [`Event`] struct carries metadata such as timestamps, task id, attempt,
//! failure classification and retry delay.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use retryvisor::{Event, EventKind, FailureKind};
//!
//! let ev = Event::new(EventKind::AttemptFailed)
//!     .with_task("node_1.create")
//!     .with_reason("connection refused")
//!     .with_attempt(3)
//!     .with_failure(FailureKind::Recoverable);
//!
//! assert_eq!(ev.kind, EventKind::AttemptFailed);
//! assert_eq!(ev.task.as_deref(), Some("node_1.create"));
//! assert_eq!(ev.failure, Some(FailureKind::Recoverable));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::outcome::FailureKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Execution events ===
    /// Execution cancellation requested; pending retries are being dropped.
    ExecutionCancelRequested,

    /// All task actors finished within the grace period after cancel.
    AllStoppedWithin,

    /// Grace period exceeded; some task actors did not stop in time.
    ///
    /// Sets: `reason` (stuck task ids).
    GraceExceeded,

    // === Attempt events ===
    /// Task accepted by the execution with its resolved policy.
    ///
    /// Sets: `task`, `reason` (resolved policy, human readable).
    TaskSubmitted,

    /// An invocation is starting.
    ///
    /// Sets: `task`, `attempt` (1-based invocation number).
    AttemptStarting,

    /// An invocation succeeded.
    ///
    /// Sets: `task`, `attempt`.
    AttemptSucceeded,

    /// An invocation failed and was classified.
    ///
    /// Sets: `task`, `attempt`, `failure`, `reason`.
    AttemptFailed,

    /// An invocation exceeded its per-attempt timeout (always followed by `AttemptFailed`).
    ///
    /// Sets: `task`, `attempt`, `timeout_ms`.
    TimeoutHit,

    // === Retry events ===
    /// Re-submission scheduled after a recoverable failure.
    ///
    /// Sets: `task`, `attempt` (the attempt that failed), `delay_ms`, `reason`.
    RetryScheduled,

    /// A pending retry was cancelled before it fired.
    ///
    /// Sets: `task`.
    RetryCancelled,

    // === Terminal events ===
    /// Task reached `Succeeded`.
    ///
    /// Sets: `task`, `attempt` (total invocations).
    TaskSucceeded,

    /// Task reached `Aborted`.
    ///
    /// Sets: `task`, `attempt` (total invocations), `failure`, `reason`.
    TaskAborted,

    /// Task stopped because its execution was cancelled; never reported to the workflow.
    ///
    /// Sets: `task`, `attempt`.
    TaskCancelled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task id, if applicable.
    pub task: Option<Arc<str>>,
    /// Invocation number (starting from 1).
    pub attempt: Option<u32>,
    /// Human-readable reason (errors, abort reasons, overflow details).
    pub reason: Option<Arc<str>>,
    /// Failure classification of the attempt or abort.
    pub failure: Option<FailureKind>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u64>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            attempt: None,
            reason: None,
            failure: None,
            delay_ms: None,
            timeout_ms: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_failure(mut self, kind: FailureKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(duration_ms(d));
        self
    }

    /// Attaches an attempt timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(duration_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for the three terminal task events.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskSucceeded | EventKind::TaskAborted | EventKind::TaskCancelled
        )
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
