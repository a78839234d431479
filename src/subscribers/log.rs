//! # Logging subscriber.
//!
//! [`LogWriter`] renders runtime events as structured `tracing` records. The crate never
//! installs a global `tracing` subscriber; the host application decides where records go.
//!
//! ## Output (fmt layer)
//! ```text
//! INFO  task submitted task=node_1.create policy="max_retries=2 retry_interval=3s"
//! INFO  attempt starting task=node_1.create attempt=1
//! WARN  attempt failed task=node_1.create attempt=1 kind=recoverable reason="..."
//! DEBUG retry scheduled task=node_1.create attempt=1 delay_ms=3000
//! WARN  task aborted task=node_1.create attempt=3 reason="retry budget exhausted ..."
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// `tracing`-backed event logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let kind = e.failure.map(|k| k.as_label()).unwrap_or("");

        match e.kind {
            EventKind::TaskSubmitted => info!(task, policy = reason, "task submitted"),
            EventKind::AttemptStarting => info!(task, attempt = e.attempt, "attempt starting"),
            EventKind::AttemptSucceeded => {
                info!(task, attempt = e.attempt, "attempt succeeded")
            }
            EventKind::AttemptFailed => {
                warn!(task, attempt = e.attempt, kind, reason, "attempt failed")
            }
            EventKind::TimeoutHit => {
                warn!(task, attempt = e.attempt, timeout_ms = e.timeout_ms, "attempt timed out")
            }
            EventKind::RetryScheduled => debug!(
                task,
                attempt = e.attempt,
                delay_ms = e.delay_ms,
                reason,
                "retry scheduled"
            ),
            EventKind::RetryCancelled => debug!(task, "pending retry cancelled"),
            EventKind::TaskSucceeded => info!(task, attempts = e.attempt, "task succeeded"),
            EventKind::TaskAborted => {
                warn!(task, attempts = e.attempt, kind, reason, "task aborted")
            }
            EventKind::TaskCancelled => info!(task, attempts = e.attempt, "task cancelled"),
            EventKind::ExecutionCancelRequested => info!("execution cancel requested"),
            EventKind::AllStoppedWithin => info!("all tasks stopped within grace"),
            EventKind::GraceExceeded => warn!(stuck = reason, "grace exceeded"),
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(subscriber = task, reason, "subscriber problem")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
