//! # Retry budget source.
//!
//! Most tasks draw their retry count from the resolved [`RetryPolicy`](crate::RetryPolicy).
//! Built-in polling/system tasks (e.g. "wait until the resource reaches ready state")
//! carry their own bound instead and are marked [`RetryBudget::Exempt`].
//!
//! ```text
//! RetryBudget::Policy                       → count against policy.max_retries
//! RetryBudget::Exempt { max_retries, .. }   → count against the task's own bound
//!                        interval: None     → space retries by policy.retry_interval
//!                        interval: Some(d)  → space retries by d
//! ```
//!
//! A per-failure `retry_after` still wins over both intervals.

use std::time::Duration;

use crate::policies::retry::MaxRetries;

/// Where a task's retry bound comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryBudget {
    /// Count retries against the resolved policy (default).
    #[default]
    Policy,
    /// Ignore the configured retry count and use the task's own bound.
    Exempt {
        /// The task's own retry bound.
        max_retries: MaxRetries,
        /// The task's own spacing, if it declares one.
        interval: Option<Duration>,
    },
}

impl RetryBudget {
    /// Exempt budget with its own bound, spaced by the resolved policy interval.
    pub fn exempt(max_retries: MaxRetries) -> Self {
        RetryBudget::Exempt {
            max_retries,
            interval: None,
        }
    }

    #[inline]
    pub fn is_exempt(&self) -> bool {
        matches!(self, RetryBudget::Exempt { .. })
    }
}
