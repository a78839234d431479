//! # Task abstraction.
//!
//! [`Task`] is the worker invocation interface as seen by the retry core: one call of
//! [`Task::invoke`] is one attempt, returning success or a raw [`TaskError`] for the
//! classifier. Remote transports implement it by returning [`TaskError::Remote`] with
//! the encoded outcome received from the worker.

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::AttemptContext;

/// # Asynchronous, cancelable operation invocation.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use retryvisor::{AttemptContext, NonRecoverableError, Task, TaskError};
///
/// struct Install;
///
/// #[async_trait]
/// impl Task for Install {
///     fn name(&self) -> &str { "node_1.install" }
///
///     async fn invoke(&self, ctx: AttemptContext) -> Result<(), TaskError> {
///         if ctx.attempt > 3 {
///             return Err(NonRecoverableError::new("package repository gone").into());
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Stable, human-readable task name.
    fn name(&self) -> &str;

    /// Runs one attempt.
    async fn invoke(&self, ctx: AttemptContext) -> Result<(), TaskError>;
}
