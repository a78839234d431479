//! # Task retry state machine.
//!
//! [`TaskRetryState`] is the per-task record that owns the retry decision. It is mutated
//! only by the task's own actor, so attempts of one task are strictly sequential.
//!
//! ```text
//!            begin_attempt()            on_outcome(Success)
//! Scheduled ───────────────► Running ─────────────────────────► Succeeded
//!     ▲                         │
//!     │                         │ on_outcome(Failure)
//!     │                         ▼
//!     │                  ClassifyingFailure
//!     │                    │            │
//!     │   resubmit()       │ budget     │ NonRecoverable, or
//!     └──────────── Retrying ◄─ left    └─ budget exhausted ─────► Aborted
//!
//! cancel() from any non-terminal state ──────────────────────────► Cancelled
//! ```
//!
//! ## Rules
//! - A `NonRecoverable` outcome aborts immediately, whatever budget remains.
//! - A `Recoverable` outcome retries while the bound permits `attempts_made` retries:
//!   the policy's `max_retries`, or the task's own bound for [`RetryBudget::Exempt`].
//! - Retry delay: the outcome's `retry_after`, else the exempt interval, else the
//!   policy interval.
//! - The policy is fixed at construction and never re-resolved.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::outcome::{FailureKind, FailureOutcome};
use crate::policies::{MaxRetries, RetryBudget, RetryPolicy};
use crate::tasks::TaskId;

/// Lifecycle status of one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Waiting for its next invocation (initial state).
    Scheduled,
    /// An invocation is in flight.
    Running,
    /// An invocation failed and the retry decision is being made.
    ClassifyingFailure,
    /// A retry was granted and is waiting on the scheduler.
    Retrying,
    /// Terminal: an invocation succeeded.
    Succeeded,
    /// Terminal: non-recoverable failure or exhausted budget.
    Aborted,
    /// Terminal: the owning execution (or the task) was cancelled. Never reported.
    Cancelled,
}

impl TaskStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Aborted | TaskStatus::Cancelled
        )
    }

    pub fn as_label(self) -> &'static str {
        match self {
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Running => "running",
            TaskStatus::ClassifyingFailure => "classifying_failure",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Aborted => "aborted",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// Result of one invocation as seen by the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(FailureOutcome),
}

/// Decision taken on an outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Terminal success; report it.
    Succeeded,
    /// Re-submit after `delay`; `retries_made` already counts this retry.
    Retry { delay: Duration, retries_made: u32 },
    /// Terminal failure; report it.
    Aborted(AbortReason),
}

/// Why a task was aborted, as surfaced to the workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The failure was declared fatal.
    #[error("failing task on non-recoverable error: {error}")]
    NonRecoverable { error: String },

    /// Every permitted retry failed.
    #[error(
        "retry budget exhausted after {attempts} attempt(s) (max_retries={max_retries}): {last_error}"
    )]
    BudgetExhausted {
        /// Total invocations made.
        attempts: u32,
        /// The bound that was exhausted.
        max_retries: MaxRetries,
        /// Reason of the last recoverable failure.
        last_error: String,
    },

    /// The task actor itself failed (panicked).
    #[error("task actor failed: {error}")]
    Internal { error: String },
}

impl AbortReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            AbortReason::NonRecoverable { .. } => "abort_non_recoverable",
            AbortReason::BudgetExhausted { .. } => "abort_budget_exhausted",
            AbortReason::Internal { .. } => "abort_internal",
        }
    }

    /// Failure kind behind the abort; budget exhaustion is a run of recoverable failures.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AbortReason::NonRecoverable { .. } | AbortReason::Internal { .. } => {
                FailureKind::NonRecoverable
            }
            AbortReason::BudgetExhausted { .. } => FailureKind::Recoverable,
        }
    }
}

/// An operation was applied in a state that does not allow it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task '{task}': cannot {op} while {from:?}")]
pub struct InvalidTransition {
    pub task: String,
    pub op: &'static str,
    pub from: TaskStatus,
}

/// Retry bookkeeping for one in-flight task.
#[derive(Clone, Debug)]
pub struct TaskRetryState {
    task_id: TaskId,
    policy: RetryPolicy,
    budget: RetryBudget,
    attempts_made: u32,
    invocations: u32,
    last_invocation: Option<Instant>,
    status: TaskStatus,
    last_error: Option<String>,
}

impl TaskRetryState {
    /// Fresh state in `Scheduled` with the resolved (immutable) policy.
    pub fn new(task_id: TaskId, policy: RetryPolicy, budget: RetryBudget) -> Self {
        Self {
            task_id,
            policy,
            budget,
            attempts_made: 0,
            invocations: 0,
            last_invocation: None,
            status: TaskStatus::Scheduled,
            last_error: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Retries granted so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Invocations started so far.
    pub fn invocations(&self) -> u32 {
        self.invocations
    }

    pub fn last_invocation(&self) -> Option<Instant> {
        self.last_invocation
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Reason of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The bound retries are counted against.
    pub fn retry_bound(&self) -> MaxRetries {
        match self.budget {
            RetryBudget::Policy => self.policy.max_retries,
            RetryBudget::Exempt { max_retries, .. } => max_retries,
        }
    }

    /// `Scheduled → Running`. Returns the 1-based invocation number.
    pub fn begin_attempt(&mut self, now: Instant) -> Result<u32, InvalidTransition> {
        self.expect_status(TaskStatus::Scheduled, "begin attempt")?;
        self.invocations = self.invocations.saturating_add(1);
        self.last_invocation = Some(now);
        self.status = TaskStatus::Running;
        Ok(self.invocations)
    }

    /// Applies the outcome of the current invocation.
    pub fn on_outcome(&mut self, outcome: AttemptOutcome) -> Result<Transition, InvalidTransition> {
        self.expect_status(TaskStatus::Running, "apply outcome")?;

        let failure = match outcome {
            AttemptOutcome::Success => {
                self.status = TaskStatus::Succeeded;
                return Ok(Transition::Succeeded);
            }
            AttemptOutcome::Failure(failure) => failure,
        };

        self.status = TaskStatus::ClassifyingFailure;
        self.last_error = Some(failure.reason().to_string());

        let retry_after = match failure {
            FailureOutcome::NonRecoverable { reason } => {
                self.status = TaskStatus::Aborted;
                return Ok(Transition::Aborted(AbortReason::NonRecoverable {
                    error: reason,
                }));
            }
            FailureOutcome::Recoverable { retry_after, .. } => retry_after,
        };

        let bound = self.retry_bound();
        if !bound.permits(self.attempts_made) {
            self.status = TaskStatus::Aborted;
            return Ok(Transition::Aborted(AbortReason::BudgetExhausted {
                attempts: self.invocations,
                max_retries: bound,
                last_error: self.last_error.clone().unwrap_or_default(),
            }));
        }

        self.attempts_made = self.attempts_made.saturating_add(1);
        self.status = TaskStatus::Retrying;
        Ok(Transition::Retry {
            delay: self.retry_delay(retry_after),
            retries_made: self.attempts_made,
        })
    }

    /// `Retrying → Scheduled` once the scheduler fires.
    pub fn resubmit(&mut self) -> Result<(), InvalidTransition> {
        self.expect_status(TaskStatus::Retrying, "resubmit")?;
        self.status = TaskStatus::Scheduled;
        Ok(())
    }

    /// Moves a non-terminal task to `Cancelled`. Returns `false` if it already finished.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Cancelled;
        true
    }

    /// Marks the task aborted from outside the normal flow (actor failure).
    pub(crate) fn abort_internal(&mut self, error: impl Into<String>) -> AbortReason {
        self.status = TaskStatus::Aborted;
        AbortReason::Internal {
            error: error.into(),
        }
    }

    fn retry_delay(&self, retry_after: Option<Duration>) -> Duration {
        let exempt_interval = match self.budget {
            RetryBudget::Exempt { interval, .. } => interval,
            RetryBudget::Policy => None,
        };
        retry_after
            .or(exempt_interval)
            .unwrap_or(self.policy.retry_interval)
    }

    fn expect_status(&self, want: TaskStatus, op: &'static str) -> Result<(), InvalidTransition> {
        if self.status == want {
            Ok(())
        } else {
            Err(InvalidTransition {
                task: self.task_id.to_string(),
                op,
                from: self.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max: MaxRetries, secs: u64, budget: RetryBudget) -> TaskRetryState {
        TaskRetryState::new(
            TaskId::from("t"),
            RetryPolicy::new(max, Duration::from_secs(secs)),
            budget,
        )
    }

    fn fail() -> AttemptOutcome {
        AttemptOutcome::Failure(FailureOutcome::recoverable("flaky", None))
    }

    /// Drives the machine with always-recoverable failures; returns invocations and the final transition.
    fn drive_failures(st: &mut TaskRetryState, limit: u32) -> (u32, Transition) {
        loop {
            let n = st.begin_attempt(Instant::now()).unwrap();
            let tr = st.on_outcome(fail()).unwrap();
            match tr {
                Transition::Retry { .. } if n < limit => st.resubmit().unwrap(),
                other => return (n, other),
            }
        }
    }

    #[test]
    fn n_retries_means_n_plus_one_invocations() {
        for n in 0..5 {
            let mut st = state(MaxRetries::Limited(n), 3, RetryBudget::Policy);
            let (invocations, tr) = drive_failures(&mut st, u32::MAX);
            assert_eq!(invocations, n + 1);
            assert!(matches!(tr, Transition::Aborted(AbortReason::BudgetExhausted { .. })));
            assert_eq!(st.status(), TaskStatus::Aborted);
            assert_eq!(st.attempts_made(), n);
        }
    }

    #[test]
    fn unlimited_never_exhausts() {
        let mut st = state(MaxRetries::Unlimited, 1, RetryBudget::Policy);
        let (invocations, tr) = drive_failures(&mut st, 500);
        assert_eq!(invocations, 500);
        assert!(matches!(tr, Transition::Retry { .. }));
    }

    #[test]
    fn non_recoverable_wins_over_budget() {
        let mut st = state(MaxRetries::Unlimited, 0, RetryBudget::Policy);
        st.begin_attempt(Instant::now()).unwrap();
        let tr = st
            .on_outcome(AttemptOutcome::Failure(FailureOutcome::non_recoverable("bad")))
            .unwrap();
        assert_eq!(
            tr,
            Transition::Aborted(AbortReason::NonRecoverable {
                error: "bad".into()
            })
        );
        assert_eq!(st.invocations(), 1);
        assert_eq!(st.attempts_made(), 0);
    }

    #[test]
    fn retry_after_beats_policy_interval() {
        let mut st = state(MaxRetries::Limited(1), 1000, RetryBudget::Policy);
        st.begin_attempt(Instant::now()).unwrap();
        let tr = st
            .on_outcome(AttemptOutcome::Failure(FailureOutcome::recoverable(
                "later",
                Some(Duration::from_secs(1)),
            )))
            .unwrap();
        assert_eq!(
            tr,
            Transition::Retry {
                delay: Duration::from_secs(1),
                retries_made: 1
            }
        );
    }

    #[test]
    fn exempt_budget_ignores_zero_retries() {
        let mut st = state(
            MaxRetries::Limited(0),
            0,
            RetryBudget::exempt(MaxRetries::Limited(3)),
        );
        let (invocations, tr) = drive_failures(&mut st, u32::MAX);
        assert_eq!(invocations, 4);
        match tr {
            Transition::Aborted(AbortReason::BudgetExhausted { max_retries, .. }) => {
                assert_eq!(max_retries, MaxRetries::Limited(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exempt_interval_is_used_when_declared() {
        let budget = RetryBudget::Exempt {
            max_retries: MaxRetries::Limited(2),
            interval: Some(Duration::from_secs(15)),
        };
        let mut st = state(MaxRetries::Limited(0), 3, budget);
        st.begin_attempt(Instant::now()).unwrap();
        match st.on_outcome(fail()).unwrap() {
            Transition::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(15)),
            other => panic!("unexpected {other:?}"),
        }

        let mut plain = state(MaxRetries::Limited(0), 3, RetryBudget::exempt(MaxRetries::Limited(2)));
        plain.begin_attempt(Instant::now()).unwrap();
        match plain.on_outcome(fail()).unwrap() {
            Transition::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(3)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn abort_messages_are_distinguishable() {
        let exhausted = AbortReason::BudgetExhausted {
            attempts: 3,
            max_retries: MaxRetries::Limited(2),
            last_error: "connection refused".into(),
        };
        assert_eq!(
            exhausted.to_string(),
            "retry budget exhausted after 3 attempt(s) (max_retries=2): connection refused"
        );
        let fatal = AbortReason::NonRecoverable {
            error: "bad input".into(),
        };
        assert_eq!(
            fatal.to_string(),
            "failing task on non-recoverable error: bad input"
        );
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut st = state(MaxRetries::Limited(1), 0, RetryBudget::Policy);
        assert!(st.on_outcome(AttemptOutcome::Success).is_err());
        assert!(st.resubmit().is_err());
        st.begin_attempt(Instant::now()).unwrap();
        assert!(st.begin_attempt(Instant::now()).is_err());
        assert_eq!(st.on_outcome(AttemptOutcome::Success).unwrap(), Transition::Succeeded);
        assert!(!st.cancel());
        assert_eq!(st.status(), TaskStatus::Succeeded);
    }

    #[test]
    fn cancel_stops_a_retrying_task() {
        let mut st = state(MaxRetries::Limited(3), 0, RetryBudget::Policy);
        st.begin_attempt(Instant::now()).unwrap();
        st.on_outcome(fail()).unwrap();
        assert_eq!(st.status(), TaskStatus::Retrying);
        assert!(st.cancel());
        assert_eq!(st.status(), TaskStatus::Cancelled);
        assert!(st.resubmit().is_err());
    }
}
