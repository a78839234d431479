//! # TaskActor: drives one task through its retry loop.
//!
//! Owns the task's [`TaskRetryState`] and is the only code that mutates it. Each attempt
//! is run by [`run_once`]; the state machine decides what follows; retries wait on the
//! [`RetryScheduler`] instead of sleeping in the actor.
//!
//! ## Architecture
//! ```text
//! Execution::submit ──► Registry ──► TaskActor::run()
//!
//! publish TaskSubmitted
//! loop {
//!   ├─► acquire semaphore (optional, cancellable; not an attempt)
//!   ├─► state.begin_attempt()           Scheduled → Running
//!   ├─► publish AttemptStarting{ attempt }
//!   ├─► run_once() ──► AttemptSucceeded / TimeoutHit / AttemptFailed
//!   ├─► state.on_outcome()
//!   │     ├─ Succeeded      ─► publish TaskSucceeded ─► report ─► exit
//!   │     ├─ Aborted(why)   ─► publish TaskAborted   ─► report ─► exit
//!   │     └─ Retry{ delay } ─► cancelled? ─► TaskCancelled, exit
//!   │                          delay = jitter(delay)
//!   │                          publish RetryScheduled
//!   │                          scheduler.schedule_retry(delay, resume)
//!   │                          await resume | cancellation
//!   └─► state.resubmit()                 Retrying → Scheduled
//! }
//! ```
//!
//! ## Rules
//! - Attempts of one task are strictly sequential.
//! - An attempt already running when cancellation arrives finishes; a terminal outcome is
//!   still reported, a retry is not scheduled.
//! - Cancelled tasks are never reported.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        machine::{AbortReason, TaskRetryState, TaskStatus, Transition},
        report::{Report, TaskReport},
        runner::{AttemptResult, run_once},
        scheduler::RetryScheduler,
    },
    error::{RuntimeError, ScheduleError},
    events::{Bus, Event, EventKind},
    policies::{JitterPolicy, RetryBudget},
    tasks::{TaskId, TaskRef},
};

/// Collaborators shared by every actor of an execution.
#[derive(Clone)]
pub(crate) struct ActorContext {
    pub bus: Bus,
    pub scheduler: RetryScheduler,
    pub reporter: Arc<dyn Report>,
    pub semaphore: Option<Arc<Semaphore>>,
    pub jitter: JitterPolicy,
}

/// Supervises one task until it reaches a terminal status.
pub(crate) struct TaskActor {
    task: TaskRef,
    timeout: Option<Duration>,
    state: TaskRetryState,
    ctx: ActorContext,
}

impl TaskActor {
    pub fn new(
        task: TaskRef,
        timeout: Option<Duration>,
        state: TaskRetryState,
        ctx: ActorContext,
    ) -> Self {
        Self {
            task,
            timeout,
            state,
            ctx,
        }
    }

    pub fn id(&self) -> &TaskId {
        self.state.task_id()
    }

    /// Runs the actor until success, abort or cancellation of `token`.
    pub async fn run(mut self, token: CancellationToken) -> TaskReport {
        self.publish_submitted();

        loop {
            let Some(permit) = self.acquire(&token).await else {
                return self.finish_cancelled();
            };

            let attempt = match self.state.begin_attempt(Instant::now()) {
                Ok(n) => n,
                Err(e) => return self.finish_internal(e.to_string()).await,
            };
            self.publish(Event::new(EventKind::AttemptStarting).with_attempt(attempt));

            let res = run_once(
                self.task.as_ref(),
                self.state.task_id(),
                attempt,
                &token,
                self.timeout,
                &self.ctx.bus,
            )
            .await;
            drop(permit);

            let outcome = match res {
                AttemptResult::Completed(outcome) => outcome,
                AttemptResult::Canceled => return self.finish_cancelled(),
            };

            let transition = match self.state.on_outcome(outcome) {
                Ok(t) => t,
                Err(e) => return self.finish_internal(e.to_string()).await,
            };

            match transition {
                Transition::Succeeded => return self.finish_succeeded().await,
                Transition::Aborted(reason) => return self.finish_aborted(reason).await,
                Transition::Retry { delay, .. } => {
                    if token.is_cancelled() {
                        return self.finish_cancelled();
                    }
                    match self.wait_retry(delay, attempt, &token).await {
                        Ok(true) => {}
                        Ok(false) => return self.finish_cancelled(),
                        Err(e) => return self.finish_internal(e.to_string()).await,
                    }
                    if let Err(e) = self.state.resubmit() {
                        return self.finish_internal(e.to_string()).await;
                    }
                }
            }
        }
    }

    /// Acquires a concurrency permit; `None` when cancelled or the semaphore closed.
    async fn acquire(&self, token: &CancellationToken) -> Option<Option<OwnedSemaphorePermit>> {
        if token.is_cancelled() {
            return None;
        }
        let Some(sem) = &self.ctx.semaphore else {
            return Some(None);
        };
        tokio::select! {
            res = Arc::clone(sem).acquire_owned() => res.ok().map(Some),
            _ = token.cancelled() => None,
        }
    }

    /// Hands the retry to the scheduler and waits for it to fire.
    ///
    /// Returns `Ok(false)` if the task was cancelled while waiting. A retry the scheduler
    /// refuses for any other reason is an internal failure of this task.
    async fn wait_retry(
        &self,
        delay: Duration,
        attempt: u32,
        token: &CancellationToken,
    ) -> Result<bool, RuntimeError> {
        let delay = self.ctx.jitter.apply(delay);
        self.publish(
            Event::new(EventKind::RetryScheduled)
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(self.state.last_error().unwrap_or_default()),
        );

        let (tx, rx) = oneshot::channel::<()>();
        let scheduled = self.ctx.scheduler.schedule_retry(self.id(), delay, move || {
            let _ = tx.send(());
        });
        match scheduled {
            Err(ScheduleError::Closed) => return Ok(false),
            Err(e) => {
                tracing::warn!(task = self.id().as_str(), error = %e, "retry not scheduled");
                return Err(e.into());
            }
            Ok(()) => {}
        }

        Ok(tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.ctx.scheduler.cancel(self.id());
                false
            }
            fired = rx => fired.is_ok(),
        })
    }

    async fn finish_succeeded(self) -> TaskReport {
        self.publish(
            Event::new(EventKind::TaskSucceeded).with_attempt(self.state.invocations()),
        );
        self.ctx.reporter.on_task_succeeded(self.id()).await;
        self.report(None)
    }

    async fn finish_aborted(self, reason: AbortReason) -> TaskReport {
        self.publish(
            Event::new(EventKind::TaskAborted)
                .with_attempt(self.state.invocations())
                .with_failure(reason.failure_kind())
                .with_reason(reason.to_string()),
        );
        self.ctx.reporter.on_task_aborted(self.id(), &reason).await;
        self.report(Some(reason))
    }

    async fn finish_internal(mut self, error: String) -> TaskReport {
        let reason = self.state.abort_internal(error);
        self.finish_aborted(reason).await
    }

    fn finish_cancelled(mut self) -> TaskReport {
        self.state.cancel();
        self.publish(
            Event::new(EventKind::TaskCancelled).with_attempt(self.state.invocations()),
        );
        self.report(None)
    }

    fn report(&self, abort: Option<AbortReason>) -> TaskReport {
        TaskReport {
            id: self.id().clone(),
            status: self.state.status(),
            invocations: self.state.invocations(),
            retries: self.state.attempts_made(),
            abort,
        }
    }

    fn publish_submitted(&self) {
        let policy = self.state.policy();
        let mut reason = format!(
            "max_retries={} retry_interval={:?}",
            policy.max_retries, policy.retry_interval
        );
        if let RetryBudget::Exempt { max_retries, .. } = self.state.budget() {
            reason.push_str(&format!(" budget_exempt(max_retries={max_retries})"));
        }
        self.publish(Event::new(EventKind::TaskSubmitted).with_reason(reason));
    }

    fn publish(&self, ev: Event) {
        self.ctx.bus.publish(ev.with_task(self.id().as_arc()));
    }
}

/// Status reported for a task whose actor could not produce a report.
pub(crate) fn panicked_report(id: TaskId, error: String) -> TaskReport {
    TaskReport {
        id,
        status: TaskStatus::Aborted,
        invocations: 0,
        retries: 0,
        abort: Some(AbortReason::Internal { error }),
    }
}
