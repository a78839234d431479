//! # Task specification.
//!
//! [`TaskSpec`] is what a workflow submits: the task plus its operation-level retry
//! override, budget source and optional per-attempt timeout. The effective policy is
//! resolved from the spec and the execution's deployment snapshot exactly once, at submit.

use std::time::Duration;

use crate::policies::{PolicyOverride, RetryBudget};
use crate::tasks::{TaskId, TaskRef};

/// Specification for running a task under the retry core.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use retryvisor::{AttemptContext, MaxRetries, PolicyOverride, RetryBudget, TaskError, TaskFn, TaskRef, TaskSpec};
///
/// let poll: TaskRef = TaskFn::arc("host.get_state", |_ctx: AttemptContext| async move {
///     Ok::<(), TaskError>(())
/// });
///
/// let spec = TaskSpec::new(poll)
///     .with_id("host_1.get_state")
///     .with_budget(RetryBudget::exempt(MaxRetries::Limited(3)))
///     .with_operation_override(PolicyOverride::new(None, Some(Duration::from_secs(1))));
///
/// assert_eq!(spec.id().as_str(), "host_1.get_state");
/// assert!(spec.budget().is_exempt());
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    id: TaskId,
    task: TaskRef,
    operation: PolicyOverride,
    budget: RetryBudget,
    timeout: Option<Duration>,
}

impl TaskSpec {
    /// Spec with no operation override, policy budget and the execution's default timeout.
    pub fn new(task: TaskRef) -> Self {
        Self {
            id: TaskId::new(task.name()),
            task,
            operation: PolicyOverride::default(),
            budget: RetryBudget::default(),
            timeout: None,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    pub fn operation_override(&self) -> &PolicyOverride {
        &self.operation
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Per-attempt timeout; `None` defers to the execution config.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_operation_override(mut self, operation: PolicyOverride) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
