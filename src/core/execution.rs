//! # Execution: one workflow run's retry runtime.
//!
//! An [`Execution`] owns the event bus, the subscriber fan-out, the retry scheduler and
//! one actor per submitted task. The deployment configuration is captured as an immutable
//! snapshot when the execution is built; every task's policy is resolved against it once,
//! at submit.
//!
//! ## High-level architecture
//! ```text
//! ExecutionBuilder::build()
//!   ├─► Bus + SubscriberSet (+ listener: Bus ─► SubscriberSet::emit)
//!   ├─► RetryScheduler (timers under the execution token)
//!   └─► Registry
//!
//! submit(TaskSpec)
//!   └─► resolve(default, deployment snapshot, operation override) ─► TaskRetryState
//!        └─► Registry::spawn(TaskActor)
//!
//! cancel()
//!   ├─► publish ExecutionCancelRequested
//!   ├─► token.cancel()        → task tokens (children) cancelled
//!   └─► scheduler.close()     → every pending retry dropped (RetryCancelled)
//!
//! wait()
//!   ├─► join every actor ─► ExecutionReport
//!   └─► once cancelled: bounded by cfg.grace
//!         ├─ all joined  → AllStoppedWithin
//!         └─ exceeded    → GraceExceeded, RuntimeError::GraceExceeded{ stuck }
//! ```
//!
//! ## Example
//! ```rust
//! use retryvisor::{
//!     AttemptContext, DeploymentConfig, Execution, MaxRetries, RuntimeConfig, TaskError,
//!     TaskSpec, TaskStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let deployment = DeploymentConfig { task_retries: Some(3), task_retry_interval: Some(0.0) };
//!     let exec = Execution::builder(RuntimeConfig::default())
//!         .with_deployment_config(&deployment)?
//!         .build();
//!
//!     let spec = TaskSpec::builder("node_1.start").build(|ctx: AttemptContext| async move {
//!         if ctx.attempt < 3 {
//!             return Err(TaskError::recoverable("service not up yet"));
//!         }
//!         Ok(())
//!     });
//!     let policy = exec.submit(spec).await?;
//!     assert_eq!(policy.max_retries, MaxRetries::Limited(3));
//!
//!     let report = exec.wait().await?;
//!     let task = report.get("node_1.start").unwrap();
//!     assert_eq!(task.status, TaskStatus::Succeeded);
//!     assert_eq!(task.invocations, 3);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        actor::{ActorContext, TaskActor, panicked_report},
        builder::ExecutionBuilder,
        config::RuntimeConfig,
        machine::TaskRetryState,
        registry::Registry,
        report::{ExecutionReport, Report, TaskReport},
        scheduler::RetryScheduler,
    },
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    policies::{PolicyOverride, RetryPolicy, resolve},
    subscribers::SubscriberSet,
    tasks::{TaskId, TaskSpec},
};

/// Retry runtime of one workflow execution.
pub struct Execution {
    cfg: RuntimeConfig,
    deployment: PolicyOverride,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Registry,
    scheduler: RetryScheduler,
    reporter: Arc<dyn Report>,
    semaphore: Option<Arc<Semaphore>>,
    token: CancellationToken,
    listener: CancellationToken,
}

impl Execution {
    /// Creates a builder for an execution with the given config.
    pub fn builder(cfg: RuntimeConfig) -> ExecutionBuilder {
        ExecutionBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: RuntimeConfig,
        deployment: PolicyOverride,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        reporter: Arc<dyn Report>,
        token: CancellationToken,
        listener: CancellationToken,
    ) -> Self {
        let semaphore = cfg.concurrency_limit().map(|n| Arc::new(Semaphore::new(n)));
        Self {
            scheduler: RetryScheduler::new(token.child_token(), bus.clone()),
            registry: Registry::new(token.clone()),
            cfg,
            deployment,
            bus,
            subs,
            reporter,
            semaphore,
            token,
            listener,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.cfg
    }

    /// The deployment snapshot captured at build time.
    pub fn deployment_override(&self) -> &PolicyOverride {
        &self.deployment
    }

    /// Resolves the policy `spec` would run with in this execution.
    pub fn resolve_policy(&self, spec: &TaskSpec) -> RetryPolicy {
        resolve(
            self.cfg.default_policy,
            Some(&self.deployment),
            Some(spec.operation_override()),
        )
    }

    /// Submits a task and starts its first attempt. Returns the resolved policy.
    ///
    /// Fails with `ExecutionClosed` after [`cancel`](Self::cancel) and with `DuplicateTask`
    /// if the id is already registered.
    pub async fn submit(&self, spec: TaskSpec) -> Result<RetryPolicy, RuntimeError> {
        if self.token.is_cancelled() {
            return Err(RuntimeError::ExecutionClosed);
        }
        let policy = self.resolve_policy(&spec);
        let state = TaskRetryState::new(spec.id().clone(), policy, spec.budget());
        let timeout = spec.timeout().or(self.cfg.default_timeout());

        let actor = TaskActor::new(
            Arc::clone(spec.task()),
            timeout,
            state,
            ActorContext {
                bus: self.bus.clone(),
                scheduler: self.scheduler.clone(),
                reporter: Arc::clone(&self.reporter),
                semaphore: self.semaphore.clone(),
                jitter: self.cfg.jitter,
            },
        );
        self.registry.spawn(actor).await?;
        Ok(policy)
    }

    /// Cancels one task: its pending retry is dropped and no further attempt starts.
    ///
    /// Returns `false` if no such task is registered.
    pub async fn cancel_task(&self, id: &TaskId) -> bool {
        self.registry.cancel(id).await
    }

    /// Cancels the whole execution. Pending retries are dropped; running attempts finish.
    pub fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.bus
            .publish(Event::new(EventKind::ExecutionCancelRequested));
        self.token.cancel();
        let dropped = self.scheduler.close();
        tracing::info!(pending_retries = dropped, "execution cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Ids of tasks submitted and not yet collected by [`wait`](Self::wait).
    pub async fn task_ids(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Creates a receiver for runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Number of configured subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Waits for every task submitted so far to reach a terminal status.
    ///
    /// Tasks stay registered until collected here, so [`cancel_task`](Self::cancel_task)
    /// and duplicate-id rejection keep working while this is pending.
    ///
    /// Without cancellation this waits as long as tasks keep retrying. Once the execution
    /// is cancelled, the remaining actors get at most `cfg.grace` to stop.
    pub async fn wait(&self) -> Result<ExecutionReport, RuntimeError> {
        let mut report = ExecutionReport::default();
        let handles = self.registry.take_joins().await;
        let mut running: BTreeSet<TaskId> = handles.iter().map(|(id, _)| id.clone()).collect();
        let mut joins: FuturesUnordered<_> = handles
            .into_iter()
            .map(|(id, join)| async move { (id, join.await) })
            .collect();

        loop {
            tokio::select! {
                biased;
                next = joins.next() => match next {
                    Some((id, res)) => self.collect(&mut report, &mut running, id, res).await,
                    None => return Ok(report),
                },
                _ = self.token.cancelled() => break,
            }
        }

        let grace = self.cfg.grace;
        let drain = async {
            while let Some((id, res)) = joins.next().await {
                self.collect(&mut report, &mut running, id, res).await;
            }
        };
        let drained = tokio::time::timeout(grace, drain).await;
        match drained {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(report)
            }
            Err(_) => {
                let stuck: Vec<String> = running.iter().map(TaskId::to_string).collect();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    async fn collect(
        &self,
        report: &mut ExecutionReport,
        running: &mut BTreeSet<TaskId>,
        id: TaskId,
        res: Result<TaskReport, tokio::task::JoinError>,
    ) {
        running.remove(&id);
        self.registry.remove(&id).await;
        let task_report = match res {
            Ok(r) => r,
            Err(join_err) => {
                let r = panicked_report(id.clone(), join_err.to_string());
                tracing::warn!(task = id.as_str(), error = %join_err, "task actor failed");
                if let Some(reason) = &r.abort {
                    self.bus.publish(
                        Event::new(EventKind::TaskAborted)
                            .with_task(id.as_arc())
                            .with_failure(reason.failure_kind())
                            .with_reason(reason.to_string()),
                    );
                    self.reporter.on_task_aborted(&id, reason).await;
                }
                r
            }
        };
        report.record(task_report);
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        self.token.cancel();
        self.listener.cancel();
    }
}
