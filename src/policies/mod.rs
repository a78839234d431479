//! Retry policies and their configuration layers.
//!
//! This module groups everything that determines **how many** times a task may be
//! retried and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`] / [`MaxRetries`] the resolved, immutable per-task policy
//! - [`PolicyOverride`], [`DeploymentConfig`], [`OperationRetry`] the partial layers
//! - [`resolve`] merges default < deployment < operation
//! - [`RetryBudget`] policy-counted vs. budget-exempt tasks
//! - [`JitterPolicy`] optional additive randomization of the interval
//!
//! ## Quick wiring
//! ```text
//! Execution (deployment snapshot) + TaskSpec (operation override, budget)
//!      └─► resolve() once at submit ─► TaskRetryState { policy, budget }
//!           └─► core::actor applies jitter to each retry delay
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → `max_retries = 0`, `retry_interval = 0s`.
//! - `RetryBudget::Policy`, `JitterPolicy::None`.

mod budget;
mod jitter;
mod overrides;
mod resolve;
mod retry;

pub use budget::RetryBudget;
pub use jitter::JitterPolicy;
pub use overrides::{DeploymentConfig, OperationRetry, PolicyOverride};
pub use resolve::resolve;
pub use retry::{MaxRetries, RetryPolicy};
