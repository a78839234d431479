//! Maps raw invocation errors to their [`FailureOutcome`].

use crate::error::TaskError;
use crate::outcome::{FailureOutcome, wire};

/// Classifies a raw invocation error.
///
/// Only an explicitly declared non-recoverable error is fatal. Errors without a declared
/// kind, timeouts and cancellations are recoverable. A remote payload is decoded; a
/// payload that fails to decode is recoverable too.
///
/// # Example
/// ```rust
/// use retryvisor::{classify, FailureKind, TaskError};
///
/// #[derive(Debug)]
/// struct Oops;
/// impl std::fmt::Display for Oops {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("oops") }
/// }
/// impl std::error::Error for Oops {}
///
/// assert_eq!(classify(&TaskError::unclassified(Oops)).kind(), FailureKind::Recoverable);
/// assert_eq!(classify(&TaskError::non_recoverable("no")).kind(), FailureKind::NonRecoverable);
/// ```
pub fn classify(err: &TaskError) -> FailureOutcome {
    match err {
        TaskError::NonRecoverable { error } => FailureOutcome::non_recoverable(error.clone()),
        TaskError::Recoverable { error, retry_after } => {
            FailureOutcome::recoverable(error.clone(), *retry_after)
        }
        TaskError::Remote { payload } => wire::decode_or_recoverable(payload),
        TaskError::Unclassified { .. } | TaskError::Timeout { .. } | TaskError::Canceled => {
            FailureOutcome::recoverable(err.to_string(), None)
        }
    }
}
