//! Failure outcomes: classification and cross-boundary encoding.
//!
//! When an invocation fails, its raw [`TaskError`](crate::TaskError) is turned into a
//! [`FailureOutcome`], the only thing the state machine looks at:
//!
//! ```text
//! TaskError::NonRecoverable ─────────────► NonRecoverable { reason }
//! TaskError::Recoverable    ─────────────► Recoverable { reason, retry_after }
//! Unclassified / Timeout / Canceled ─────► Recoverable { reason, retry_after: None }
//! TaskError::Remote(bytes) ─► decode ─┬──► (decoded outcome, kind preserved)
//!                                     └──► Recoverable on decode failure
//! ```
//!
//! Ambiguity always resolves to "try again": neither an unknown error type nor a
//! corrupted payload can make a task fatal.

mod classify;
mod wire;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use classify::classify;
pub use wire::{WIRE_VERSION, decode, decode_or_recoverable, encode, encode_error};

/// Classification of a failed invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureOutcome {
    /// Transient: retried within the task's budget.
    Recoverable {
        /// Failure message.
        reason: String,
        /// Overrides the policy interval for the next retry.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after: Option<Duration>,
    },
    /// Fatal: the task is aborted after this attempt.
    NonRecoverable {
        /// Failure message.
        reason: String,
    },
}

impl FailureOutcome {
    pub fn recoverable(reason: impl Into<String>, retry_after: Option<Duration>) -> Self {
        FailureOutcome::Recoverable {
            reason: reason.into(),
            retry_after,
        }
    }

    pub fn non_recoverable(reason: impl Into<String>) -> Self {
        FailureOutcome::NonRecoverable {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FailureOutcome::Recoverable { .. } => FailureKind::Recoverable,
            FailureOutcome::NonRecoverable { .. } => FailureKind::NonRecoverable,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            FailureOutcome::Recoverable { reason, .. }
            | FailureOutcome::NonRecoverable { reason } => reason,
        }
    }

    /// Per-failure retry delay; always `None` for non-recoverable outcomes.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FailureOutcome::Recoverable { retry_after, .. } => *retry_after,
            FailureOutcome::NonRecoverable { .. } => None,
        }
    }
}

/// Tag of a [`FailureOutcome`], without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Recoverable,
    NonRecoverable,
}

impl FailureKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureKind::Recoverable => "recoverable",
            FailureKind::NonRecoverable => "non_recoverable",
        }
    }
}
