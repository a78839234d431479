//! Error types used by the retry runtime and by tasks.
//!
//! - [`TaskError`] is what a single invocation returns when it fails. It is the raw
//!   error the classifier inspects to decide whether the task is retried.
//! - [`RecoverableError`] and [`NonRecoverableError`] are declared-kind errors that user
//!   code raises (directly or wrapped in `anyhow`) to steer the classifier.
//! - [`RuntimeError`], [`ScheduleError`], [`ConfigError`] and [`CodecError`] are raised by
//!   the runtime itself.
//!
//! Every enum exposes `as_label()` for logs and event payloads.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the execution runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Execution was cancelled and some task actors did not finish within the grace period.
    #[error("grace period {grace:?} exceeded after cancel; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of tasks that were still running.
        stuck: Vec<String>,
    },

    /// A task with the same id is already in flight in this execution.
    #[error("task '{task}' is already registered in this execution")]
    DuplicateTask {
        /// Offending task id.
        task: String,
    },

    /// The execution has been cancelled and accepts no new tasks.
    #[error("execution is closed")]
    ExecutionClosed,

    /// Retry scheduling failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use retryvisor::RuntimeError;
    ///
    /// let err = RuntimeError::ExecutionClosed;
    /// assert_eq!(err.as_label(), "runtime_execution_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::DuplicateTask { .. } => "runtime_duplicate_task",
            RuntimeError::ExecutionClosed => "runtime_execution_closed",
            RuntimeError::Schedule(e) => e.as_label(),
        }
    }
}

/// Errors returned by [`RetryScheduler`](crate::RetryScheduler).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A retry is already pending for this task; attempts are strictly sequential.
    #[error("a retry is already pending for task '{task}'")]
    AlreadyPending {
        /// Task id.
        task: String,
    },

    /// The scheduler was closed (owning execution cancelled).
    #[error("retry scheduler is closed")]
    Closed,
}

impl ScheduleError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::AlreadyPending { .. } => "schedule_already_pending",
            ScheduleError::Closed => "schedule_closed",
        }
    }
}

/// Errors raised while reading retry configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Retry count is neither `-1` (unlimited) nor a non-negative integer.
    #[error("invalid {field}: {value} (expected -1 for unlimited or a non-negative integer)")]
    InvalidRetries { field: &'static str, value: i64 },

    /// Interval is negative, NaN or infinite.
    #[error("invalid {field}: {value} (expected a finite, non-negative number of seconds)")]
    InvalidInterval { field: &'static str, value: f64 },

    /// The configuration document could not be parsed.
    #[error("malformed retry configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidRetries { .. } => "config_invalid_retries",
            ConfigError::InvalidInterval { .. } => "config_invalid_interval",
            ConfigError::Malformed(_) => "config_malformed",
        }
    }
}

/// Errors raised when a failure outcome cannot be decoded from the wire.
///
/// The controller never surfaces these to a workflow: an undecodable outcome is
/// routed to a recoverable failure by [`decode_or_recoverable`](crate::outcome::decode_or_recoverable).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failure outcome is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported failure outcome version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },
}

impl CodecError {
    pub fn as_label(&self) -> &'static str {
        match self {
            CodecError::Json(_) => "codec_json",
            CodecError::UnsupportedVersion { .. } => "codec_unsupported_version",
        }
    }
}

/// # Errors produced by one task invocation.
///
/// The variant is the error's *declared kind*. Only [`TaskError::NonRecoverable`]
/// stops a task immediately; every other variant is retried within the budget.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// Invocation exceeded its per-attempt timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// User code declared the failure fatal.
    #[error("non-recoverable error: {error}")]
    NonRecoverable {
        /// Failure message.
        error: String,
    },

    /// User code declared the failure transient, optionally with its own retry delay.
    #[error("recoverable error: {error}")]
    Recoverable {
        /// Failure message.
        error: String,
        /// Overrides the policy interval for the next retry.
        retry_after: Option<Duration>,
    },

    /// Arbitrary error without a declared kind.
    #[error("{error}")]
    Unclassified {
        /// Failure message.
        error: String,
        /// Rust type name of the original error, when known.
        type_name: Option<String>,
    },

    /// Failure reported by a remote worker as an encoded outcome.
    #[error("remote failure ({} byte payload)", payload.len())]
    Remote {
        /// Encoded [`FailureOutcome`](crate::FailureOutcome).
        payload: Vec<u8>,
    },

    /// Invocation observed cancellation of its context and stopped early.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Transient failure using the policy interval.
    pub fn recoverable(error: impl Into<String>) -> Self {
        TaskError::Recoverable {
            error: error.into(),
            retry_after: None,
        }
    }

    /// Transient failure that asks to be retried after `retry_after`.
    pub fn retry_after(error: impl Into<String>, retry_after: Duration) -> Self {
        TaskError::Recoverable {
            error: error.into(),
            retry_after: Some(retry_after),
        }
    }

    /// Fatal failure; the task is aborted without further attempts.
    pub fn non_recoverable(error: impl Into<String>) -> Self {
        TaskError::NonRecoverable {
            error: error.into(),
        }
    }

    /// Wraps any error whose kind was not declared. Classified as recoverable.
    pub fn unclassified<E>(err: E) -> Self
    where
        E: std::error::Error,
    {
        TaskError::Unclassified {
            error: err.to_string(),
            type_name: Some(std::any::type_name::<E>().to_string()),
        }
    }

    /// Failure payload received from a worker on the other side of a process boundary.
    pub fn remote(payload: impl Into<Vec<u8>>) -> Self {
        TaskError::Remote {
            payload: payload.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use retryvisor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::NonRecoverable { .. } => "task_non_recoverable",
            TaskError::Recoverable { .. } => "task_recoverable",
            TaskError::Unclassified { .. } => "task_unclassified",
            TaskError::Remote { .. } => "task_remote",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// Declared fatal error for user code.
///
/// Raising it (directly, through `?`, or wrapped by `anyhow`) aborts the task
/// after the current attempt regardless of the remaining retry budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NonRecoverableError {
    message: String,
}

impl NonRecoverableError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Declared transient error for user code, with an optional retry delay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RecoverableError {
    message: String,
    retry_after: Option<Duration>,
}

impl RecoverableError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Requests the next retry after `delay` instead of the policy interval.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

impl From<NonRecoverableError> for TaskError {
    fn from(err: NonRecoverableError) -> Self {
        TaskError::NonRecoverable { error: err.message }
    }
}

impl From<RecoverableError> for TaskError {
    fn from(err: RecoverableError) -> Self {
        TaskError::Recoverable {
            error: err.message,
            retry_after: err.retry_after,
        }
    }
}

/// Maps an `anyhow` error to its declared kind.
///
/// The whole cause chain is searched, so `Err(NonRecoverableError::new(..)).context(..)`
/// stays fatal. Errors with no declared kind anywhere in the chain become
/// [`TaskError::Unclassified`].
impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            if let Some(task_err) = cause.downcast_ref::<TaskError>() {
                return task_err.clone();
            }
            if cause.downcast_ref::<NonRecoverableError>().is_some() {
                return TaskError::NonRecoverable { error: message };
            }
            if let Some(rec) = cause.downcast_ref::<RecoverableError>() {
                return TaskError::Recoverable {
                    error: message,
                    retry_after: rec.retry_after(),
                };
            }
        }
        TaskError::Unclassified {
            error: message,
            type_name: None,
        }
    }
}
