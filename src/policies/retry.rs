//! # Effective retry policy for one task.
//!
//! [`RetryPolicy`] is the pair the state machine consults on every recoverable failure:
//! - [`RetryPolicy::max_retries`] how many retries are allowed after the initial attempt;
//! - [`RetryPolicy::retry_interval`] how long to wait before each retry.
//!
//! [`MaxRetries::Unlimited`] is the wire/config sentinel `-1`. A concrete `N` allows at
//! most `N + 1` invocations in total.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use retryvisor::{MaxRetries, RetryPolicy};
//!
//! let policy = RetryPolicy::new(MaxRetries::Limited(2), Duration::from_secs(3));
//! assert_eq!(policy.max_invocations(), Some(3));
//! assert!(policy.max_retries.permits(1));
//! assert!(!policy.max_retries.permits(2));
//!
//! let forever = RetryPolicy::unlimited(Duration::from_secs(1));
//! assert!(forever.max_retries.permits(u32::MAX));
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Retry bound: a concrete count or unlimited.
///
/// Serialized as a signed integer where `-1` means unlimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MaxRetries {
    /// At most `n` retries after the initial attempt.
    Limited(u32),
    /// The budget is never exhausted.
    Unlimited,
}

impl MaxRetries {
    /// Config/wire sentinel for [`MaxRetries::Unlimited`].
    pub const UNLIMITED: i64 = -1;

    /// Parses the raw config value; `-1` is unlimited, other negatives are rejected.
    ///
    /// Values above `u32::MAX` saturate.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            Self::UNLIMITED => Some(MaxRetries::Unlimited),
            n if n >= 0 => Some(MaxRetries::Limited(u32::try_from(n).unwrap_or(u32::MAX))),
            _ => None,
        }
    }

    /// Inverse of [`MaxRetries::from_raw`].
    pub fn as_raw(self) -> i64 {
        match self {
            MaxRetries::Limited(n) => i64::from(n),
            MaxRetries::Unlimited => Self::UNLIMITED,
        }
    }

    /// Returns `true` if another retry is allowed after `retries_made` retries.
    #[inline]
    pub fn permits(self, retries_made: u32) -> bool {
        match self {
            MaxRetries::Limited(n) => retries_made < n,
            MaxRetries::Unlimited => true,
        }
    }

    #[inline]
    pub fn is_unlimited(self) -> bool {
        matches!(self, MaxRetries::Unlimited)
    }
}

impl Default for MaxRetries {
    /// No retries.
    fn default() -> Self {
        MaxRetries::Limited(0)
    }
}

impl fmt::Display for MaxRetries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxRetries::Limited(n) => write!(f, "{n}"),
            MaxRetries::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl TryFrom<i64> for MaxRetries {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        MaxRetries::from_raw(value).ok_or(ConfigError::InvalidRetries {
            field: "max_retries",
            value,
        })
    }
}

impl From<MaxRetries> for i64 {
    fn from(value: MaxRetries) -> Self {
        value.as_raw()
    }
}

/// Resolved retry policy of a task.
///
/// Immutable for the lifetime of the task once resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: MaxRetries,
    /// Delay before each retry (`0` = immediate).
    pub retry_interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: MaxRetries, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    /// Unlimited retries spaced by `retry_interval`.
    pub fn unlimited(retry_interval: Duration) -> Self {
        Self::new(MaxRetries::Unlimited, retry_interval)
    }

    /// Total invocations this policy allows (`None` = unbounded).
    pub fn max_invocations(&self) -> Option<u64> {
        match self.max_retries {
            MaxRetries::Limited(n) => Some(u64::from(n) + 1),
            MaxRetries::Unlimited => None,
        }
    }
}
