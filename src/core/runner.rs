//! # Run a single attempt of a task.
//!
//! Executes one invocation of a [`Task`] with optional timeout, classifies its result and
//! publishes attempt events to the [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   task.invoke() → Ok(()) → publish AttemptSucceeded
//!
//! Failure:
//!   task.invoke() → Err(e) → classify(e) → publish AttemptFailed{failure kind, reason}
//!
//! Timeout:
//!   timeout exceeded → cancel child → publish TimeoutHit
//!                                   → Err(Timeout) → publish AttemptFailed (recoverable)
//!
//! Cancellation:
//!   parent cancelled and task returned Err(Canceled) → no attempt event, AttemptResult::Canceled
//! ```
//!
//! ## Rules
//! - Derives a **child token** per attempt; cancelling it does not affect the parent.
//! - `TaskError::Canceled` counts as cancellation only when the parent token is cancelled;
//!   otherwise it is an ordinary (recoverable) failure.
//! - An invocation that finishes after its execution was cancelled still yields its outcome.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    core::machine::AttemptOutcome,
    error::TaskError,
    events::{Bus, Event, EventKind},
    outcome::{FailureOutcome, classify},
    tasks::{AttemptContext, Task, TaskId},
};

/// What one attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptResult {
    /// The invocation finished; its outcome goes to the state machine.
    Completed(AttemptOutcome),
    /// The invocation stopped because its execution was cancelled.
    Canceled,
}

/// Executes a single attempt of `task`.
pub(crate) async fn run_once<T: Task + ?Sized>(
    task: &T,
    id: &TaskId,
    attempt: u32,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    bus: &Bus,
) -> AttemptResult {
    let child = parent.child_token();
    let ctx = AttemptContext {
        task_id: id.clone(),
        attempt,
        token: child.clone(),
    };

    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, task.invoke(ctx)).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_task(id.as_arc())
                        .with_attempt(attempt)
                        .with_timeout(dur),
                );
                Err(TaskError::Timeout { timeout: dur })
            }
        }
    } else {
        task.invoke(ctx).await
    };

    match res {
        Ok(()) => {
            bus.publish(
                Event::new(EventKind::AttemptSucceeded)
                    .with_task(id.as_arc())
                    .with_attempt(attempt),
            );
            AttemptResult::Completed(AttemptOutcome::Success)
        }
        Err(TaskError::Canceled) if parent.is_cancelled() => AttemptResult::Canceled,
        Err(e) => {
            let failure = classify(&e);
            publish_failed(bus, id, attempt, &failure);
            AttemptResult::Completed(AttemptOutcome::Failure(failure))
        }
    }
}

fn publish_failed(bus: &Bus, id: &TaskId, attempt: u32, failure: &FailureOutcome) {
    bus.publish(
        Event::new(EventKind::AttemptFailed)
            .with_task(id.as_arc())
            .with_attempt(attempt)
            .with_failure(failure.kind())
            .with_reason(failure.reason()),
    );
}
