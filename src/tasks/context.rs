use tokio_util::sync::CancellationToken;

use crate::tasks::TaskId;

/// Per-invocation context handed to [`Task::invoke`](crate::Task::invoke).
///
/// The token is cancelled when the owning execution (or this task) is cancelled or the
/// attempt timed out. Honoring it is cooperative; an invocation that keeps running still
/// has its outcome classified, but no retry follows a cancellation.
#[derive(Clone, Debug)]
pub struct AttemptContext {
    /// Task being invoked.
    pub task_id: TaskId,
    /// Invocation number, starting at 1.
    pub attempt: u32,
    /// Cancellation signal for this invocation.
    pub token: CancellationToken,
}

impl AttemptContext {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True on the first invocation.
    #[inline]
    pub fn is_first_attempt(&self) -> bool {
        self.attempt == 1
    }
}
