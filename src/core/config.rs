//! # Execution runtime configuration.
//!
//! Provides [`RuntimeConfig`], the settings an [`Execution`](crate::Execution) is built with.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no global semaphore created)
//! - `timeout = 0s` → no per-attempt timeout

use std::time::Duration;

use crate::policies::{JitterPolicy, RetryPolicy};

/// Configuration for one workflow execution.
///
/// ## Field semantics
/// - `grace`: how long [`Execution::wait`](crate::Execution::wait) waits for task actors after cancel
/// - `max_concurrent`: in-flight attempt limit across all tasks (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `timeout`: default per-attempt timeout (`0s` = none), overridable per task
/// - `default_policy`: built-in layer of policy resolution
/// - `jitter`: additive randomization of retry delays
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over checking sentinels (`0`) directly.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Maximum time to wait for task actors to stop once the execution is cancelled.
    ///
    /// If exceeded, [`Execution::wait`](crate::Execution::wait) returns
    /// `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Maximum number of attempts running concurrently.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = at most `n` invocations at once; tasks waiting for a permit are not
    ///   charged an attempt
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default per-attempt timeout.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = a slower attempt fails with `TaskError::Timeout` (recoverable)
    pub timeout: Duration,

    /// Built-in default policy, overridden by deployment config and operation declarations.
    pub default_policy: RetryPolicy,

    /// Jitter added on top of every retry delay.
    pub jitter: JitterPolicy,
}

impl RuntimeConfig {
    /// Returns the global concurrency limit as an `Option`.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the default per-attempt timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `grace = 60s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `timeout = 0s` (no timeout)
    /// - `default_policy = RetryPolicy::default()` (no retries, immediate)
    /// - `jitter = JitterPolicy::None`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            max_concurrent: 0,
            bus_capacity: 1024,
            timeout: Duration::ZERO,
            default_policy: RetryPolicy::default(),
            jitter: JitterPolicy::None,
        }
    }
}
