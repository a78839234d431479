use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use crate::error::{ConfigError, TaskError};
use crate::policies::{MaxRetries, OperationRetry, PolicyOverride, RetryBudget};
use crate::tasks::{AttemptContext, TaskFn, TaskId, TaskRef, TaskSpec};

/// Builder for [`TaskSpec`] with fluent API.
///
/// ```rust
/// use std::time::Duration;
/// use retryvisor::{AttemptContext, MaxRetries, TaskError, TaskSpec};
///
/// let spec = TaskSpec::builder("node_1.create")
///     .max_retries(MaxRetries::Limited(5))
///     .retry_interval(Duration::from_secs(2))
///     .build(|_ctx: AttemptContext| async { Ok::<(), TaskError>(()) });
///
/// assert_eq!(spec.operation_override().max_retries, Some(MaxRetries::Limited(5)));
/// ```
#[derive(Clone)]
pub struct TaskSpecBuilder {
    name: Cow<'static, str>,
    id: Option<TaskId>,
    operation: PolicyOverride,
    budget: RetryBudget,
    timeout: Option<Duration>,
}

impl TaskSpecBuilder {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            id: None,
            operation: PolicyOverride::default(),
            budget: RetryBudget::default(),
            timeout: None,
        }
    }

    pub fn id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Operation-level `max_retries`.
    pub fn max_retries(mut self, max_retries: MaxRetries) -> Self {
        self.operation.max_retries = Some(max_retries);
        self
    }

    /// Operation-level `retry_interval`.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.operation.retry_interval = Some(interval);
        self
    }

    /// Applies a blueprint operation declaration; its set fields replace earlier ones.
    pub fn operation_retry(mut self, op: &OperationRetry) -> Result<Self, ConfigError> {
        let ov = op.to_override()?;
        self.operation = PolicyOverride {
            max_retries: ov.max_retries.or(self.operation.max_retries),
            retry_interval: ov.retry_interval.or(self.operation.retry_interval),
        };
        Ok(self)
    }

    /// Marks the task budget-exempt with its own retry bound.
    pub fn budget_exempt(mut self, max_retries: MaxRetries) -> Self {
        self.budget = RetryBudget::exempt(max_retries);
        self
    }

    pub fn budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the spec from a closure.
    pub fn build<F, Fut>(self, f: F) -> TaskSpec
    where
        F: Fn(AttemptContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let task: TaskRef = TaskFn::arc(self.name.clone(), f);
        self.build_from_task(task)
    }

    /// Builds the spec around an existing task.
    pub fn build_from_task(self, task: TaskRef) -> TaskSpec {
        let spec = TaskSpec::new(task)
            .with_operation_override(self.operation)
            .with_budget(self.budget)
            .with_timeout(self.timeout);
        match self.id {
            Some(id) => spec.with_id(id),
            None => spec,
        }
    }
}

impl TaskSpec {
    /// Creates a builder for constructing a [`TaskSpec`].
    pub fn builder(name: impl Into<Cow<'static, str>>) -> TaskSpecBuilder {
        TaskSpecBuilder::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: AttemptContext) -> std::future::Ready<Result<(), TaskError>> {
        std::future::ready(Ok(()))
    }

    #[test]
    fn blueprint_declaration_overlays_builder_fields() {
        let op = OperationRetry {
            max_retries: None,
            retry_interval: Some(1.0),
        };
        let spec = TaskSpec::builder("n.op")
            .max_retries(MaxRetries::Limited(1))
            .retry_interval(Duration::from_secs(1000))
            .operation_retry(&op)
            .unwrap()
            .build(noop);

        assert_eq!(
            *spec.operation_override(),
            PolicyOverride::new(Some(MaxRetries::Limited(1)), Some(Duration::from_secs(1)))
        );
        assert_eq!(spec.id().as_str(), "n.op");
    }

    #[test]
    fn explicit_id_and_exemption() {
        let spec = TaskSpec::builder("host.get_state")
            .id("host_7.get_state")
            .budget_exempt(MaxRetries::Limited(3))
            .timeout(Duration::from_secs(30))
            .build(noop);

        assert_eq!(spec.id().as_str(), "host_7.get_state");
        assert_eq!(spec.task().name(), "host.get_state");
        assert_eq!(spec.budget(), RetryBudget::exempt(MaxRetries::Limited(3)));
        assert_eq!(spec.timeout(), Some(Duration::from_secs(30)));
    }
}
