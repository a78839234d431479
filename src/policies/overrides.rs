//! # Partial retry settings from configuration layers.
//!
//! Two external sources may override the built-in default:
//! - [`DeploymentConfig`] deployment-wide `task_retries` / `task_retry_interval`,
//!   read once per workflow execution;
//! - [`OperationRetry`] per-operation `max_retries` / `retry_interval` declared in the
//!   blueprint.
//!
//! Both validate into a [`PolicyOverride`], where an unset field falls through to the
//! next layer during [`resolve`](crate::policies::resolve).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::policies::retry::{MaxRetries, RetryPolicy};

/// A validated, partially specified retry policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PolicyOverride {
    pub max_retries: Option<MaxRetries>,
    pub retry_interval: Option<Duration>,
}

impl PolicyOverride {
    pub fn new(max_retries: Option<MaxRetries>, retry_interval: Option<Duration>) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.max_retries.is_none() && self.retry_interval.is_none()
    }

    /// Overlays the set fields onto `base`.
    pub fn apply(&self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            retry_interval: self.retry_interval.unwrap_or(base.retry_interval),
        }
    }
}

/// Per-operation retry declaration as it appears in a blueprint.
///
/// ```rust
/// use retryvisor::{MaxRetries, OperationRetry};
///
/// let op: OperationRetry = serde_json::from_str(r#"{"max_retries": -1}"#).unwrap();
/// let ov = op.to_override().unwrap();
/// assert_eq!(ov.max_retries, Some(MaxRetries::Unlimited));
/// assert!(ov.retry_interval.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationRetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_interval: Option<f64>,
}

impl OperationRetry {
    pub fn to_override(&self) -> Result<PolicyOverride, ConfigError> {
        Ok(PolicyOverride {
            max_retries: self
                .max_retries
                .map(|v| parse_retries("max_retries", v))
                .transpose()?,
            retry_interval: self
                .retry_interval
                .map(|v| parse_interval("retry_interval", v))
                .transpose()?,
        })
    }
}

/// Deployment-scoped workflow configuration snapshot.
///
/// Read-only from the retry core's perspective and captured once per execution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Retry count, `-1` for unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_retries: Option<i64>,
    /// Seconds between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_retry_interval: Option<f64>,
}

impl DeploymentConfig {
    /// Reads the retry settings from a manager context document.
    ///
    /// Accepts the full context (`{"cloudify": {"workflows": {...}}}`), the
    /// `{"workflows": {...}}` section, or the flat settings object. Unknown keys are ignored.
    ///
    /// ```rust
    /// use retryvisor::DeploymentConfig;
    ///
    /// let ctx = serde_json::json!({
    ///     "cloudify": { "workflows": { "task_retries": 2, "task_retry_interval": 3 } }
    /// });
    /// let cfg = DeploymentConfig::from_context(&ctx).unwrap();
    /// assert_eq!(cfg.task_retries, Some(2));
    /// assert_eq!(cfg.task_retry_interval, Some(3.0));
    /// ```
    pub fn from_context(ctx: &Value) -> Result<Self, ConfigError> {
        let section = ctx
            .pointer("/cloudify/workflows")
            .or_else(|| ctx.get("workflows"))
            .unwrap_or(ctx);
        Ok(Self::deserialize(section)?)
    }

    pub fn to_override(&self) -> Result<PolicyOverride, ConfigError> {
        Ok(PolicyOverride {
            max_retries: self
                .task_retries
                .map(|v| parse_retries("task_retries", v))
                .transpose()?,
            retry_interval: self
                .task_retry_interval
                .map(|v| parse_interval("task_retry_interval", v))
                .transpose()?,
        })
    }
}

fn parse_retries(field: &'static str, value: i64) -> Result<MaxRetries, ConfigError> {
    MaxRetries::from_raw(value).ok_or(ConfigError::InvalidRetries { field, value })
}

fn parse_interval(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidInterval { field, value })
}
