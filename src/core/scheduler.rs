//! # Retry scheduler: timer-driven, cancellable re-submission.
//!
//! [`RetryScheduler`] runs a resume callback for a task no earlier than a given delay,
//! without blocking the caller. Each pending retry is a spawned tokio timer; no thread is
//! parked per retry.
//!
//! ```text
//! schedule_retry(id, delay, resume)
//!     ├─► deadline = now + delay          (fixed before returning)
//!     ├─► pending[id] = { generation, cancel }
//!     └─► spawn ─► select! {
//!                    cancel.cancelled()   → drop resume
//!                    sleep_until(deadline) → take pending[id] (same generation) → resume()
//!                  }
//!
//! cancel(id)  ─► remove pending[id], cancel its token ─► publish RetryCancelled
//! close()     ─► reject new retries, cancel every pending one
//! ```
//!
//! ## Rules
//! - The delay is a lower bound: the callback never fires before the deadline.
//! - At most one pending retry per task; a second one is `AlreadyPending`.
//! - After `cancel` returns `true` the callback never runs. If it returns `false` the
//!   callback has already been taken (or nothing was pending).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::ScheduleError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskId;

/// Upper bound on a single delay; longer requests are clamped (about 30 years).
const MAX_DELAY: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

struct Pending {
    generation: u64,
    cancel: CancellationToken,
}

struct Inner {
    pending: Mutex<HashMap<TaskId, Pending>>,
    generation: AtomicU64,
    token: CancellationToken,
    bus: Bus,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Pending>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Removes the entry only if it still belongs to the firing timer.
    fn take_if_current(&self, task: &TaskId, generation: u64) -> bool {
        let mut pending = self.lock();
        match pending.get(task) {
            Some(p) if p.generation == generation => {
                pending.remove(task);
                true
            }
            _ => false,
        }
    }
}

/// Schedules delayed re-submission of tasks.
///
/// Cheap to clone; clones share the pending set.
#[derive(Clone)]
pub struct RetryScheduler {
    inner: Arc<Inner>,
}

impl RetryScheduler {
    /// Creates a scheduler whose timers stop when `token` is cancelled.
    pub fn new(token: CancellationToken, bus: Bus) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                token,
                bus,
            }),
        }
    }

    /// Runs `resume` no earlier than `after` from now. Returns immediately.
    ///
    /// Must be called inside a tokio runtime.
    pub fn schedule_retry<F>(
        &self,
        task: &TaskId,
        after: Duration,
        resume: F,
    ) -> Result<(), ScheduleError>
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + after.min(MAX_DELAY);

        let (generation, cancel) = {
            let mut pending = self.inner.lock();
            if self.inner.token.is_cancelled() {
                return Err(ScheduleError::Closed);
            }
            if pending.contains_key(task) {
                return Err(ScheduleError::AlreadyPending {
                    task: task.to_string(),
                });
            }
            let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
            let cancel = self.inner.token.child_token();
            pending.insert(
                task.clone(),
                Pending {
                    generation,
                    cancel: cancel.clone(),
                },
            );
            (generation, cancel)
        };

        let inner = Arc::clone(&self.inner);
        let task = task.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = sleep_until(deadline) => {
                    if inner.take_if_current(&task, generation) {
                        resume();
                    }
                }
            }
        });
        Ok(())
    }

    /// Cancels the pending retry of `task`. Returns `true` if one was pending.
    pub fn cancel(&self, task: &TaskId) -> bool {
        let removed = self.inner.lock().remove(task);
        match removed {
            Some(p) => {
                p.cancel.cancel();
                self.publish_cancelled(task);
                true
            }
            None => false,
        }
    }

    /// Cancels every pending retry; returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(TaskId, Pending)> = self.inner.lock().drain().collect();
        for (task, p) in &drained {
            p.cancel.cancel();
            self.publish_cancelled(task);
        }
        drained.len()
    }

    /// Rejects new retries and cancels pending ones.
    pub fn close(&self) -> usize {
        self.inner.token.cancel();
        self.cancel_all()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub fn is_pending(&self, task: &TaskId) -> bool {
        self.inner.lock().contains_key(task)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().len()
    }

    fn publish_cancelled(&self, task: &TaskId) {
        tracing::debug!(task = task.as_str(), "pending retry cancelled");
        self.inner
            .bus
            .publish(Event::new(EventKind::RetryCancelled).with_task(task.as_arc()));
    }
}
