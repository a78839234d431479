//! # Workflow reporting.
//!
//! Only terminal outcomes leave the retry core. [`Report`] is the interface the
//! surrounding workflow engine implements to learn about them; the engine is never asked
//! whether to retry.
//!
//! [`TaskReport`] / [`ExecutionReport`] are the summaries returned by
//! [`Execution::wait`](crate::Execution::wait).

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::machine::{AbortReason, TaskStatus};
use crate::tasks::TaskId;

/// Receives terminal task outcomes.
///
/// Cancelled tasks are never reported.
#[async_trait]
pub trait Report: Send + Sync + 'static {
    async fn on_task_succeeded(&self, task: &TaskId);

    /// `reason` distinguishes a declared-fatal failure from an exhausted budget.
    async fn on_task_aborted(&self, task: &TaskId, reason: &AbortReason);
}

/// Reporter that ignores every outcome; the default when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReport;

#[async_trait]
impl Report for NoopReport {
    async fn on_task_succeeded(&self, _task: &TaskId) {}

    async fn on_task_aborted(&self, _task: &TaskId, _reason: &AbortReason) {}
}

/// Final state of one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskReport {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Invocations made.
    pub invocations: u32,
    /// Retries granted.
    pub retries: u32,
    /// Set when `status` is `Aborted`.
    pub abort: Option<AbortReason>,
}

/// Final states of every task awaited by [`Execution::wait`](crate::Execution::wait).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    tasks: BTreeMap<TaskId, TaskReport>,
}

impl ExecutionReport {
    pub(crate) fn record(&mut self, report: TaskReport) {
        self.tasks.insert(report.id.clone(), report);
    }

    pub fn get(&self, id: &str) -> Option<&TaskReport> {
        self.tasks.get(id)
    }

    /// True when every task succeeded (vacuously true for an empty execution).
    pub fn is_success(&self) -> bool {
        self.tasks
            .values()
            .all(|t| t.status == TaskStatus::Succeeded)
    }

    /// Tasks that ended `Aborted`, in id order.
    pub fn aborted(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Aborted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
