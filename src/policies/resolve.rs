//! # Policy resolution.
//!
//! Merges the three configuration layers into the one [`RetryPolicy`] a task keeps for
//! its whole lifetime:
//!
//! ```text
//! operation override  >  deployment config  >  built-in default
//! ```
//!
//! Each field is resolved independently: an unset field at one layer falls through to
//! the next. Resolution is pure and never fails; validation happens when the layers are
//! parsed (see [`OperationRetry`](crate::OperationRetry), [`DeploymentConfig`](crate::DeploymentConfig)).

use crate::policies::overrides::PolicyOverride;
use crate::policies::retry::RetryPolicy;

/// Resolves the effective policy for one task.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use retryvisor::{resolve, MaxRetries, PolicyOverride, RetryPolicy};
///
/// let deployment = PolicyOverride::new(Some(MaxRetries::Limited(1)), Some(Duration::from_secs(1000)));
/// let operation = PolicyOverride::new(None, Some(Duration::from_secs(1)));
///
/// let policy = resolve(RetryPolicy::default(), Some(&deployment), Some(&operation));
/// assert_eq!(policy.max_retries, MaxRetries::Limited(1));
/// assert_eq!(policy.retry_interval, Duration::from_secs(1));
/// ```
pub fn resolve(
    default: RetryPolicy,
    deployment: Option<&PolicyOverride>,
    operation: Option<&PolicyOverride>,
) -> RetryPolicy {
    let deployed = deployment.map_or(default, |d| d.apply(default));
    operation.map_or(deployed, |o| o.apply(deployed))
}
