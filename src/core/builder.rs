use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::RuntimeConfig,
        execution::Execution,
        report::{NoopReport, Report},
    },
    error::ConfigError,
    events::Bus,
    policies::{DeploymentConfig, PolicyOverride},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for an [`Execution`].
pub struct ExecutionBuilder {
    cfg: RuntimeConfig,
    deployment: PolicyOverride,
    subscribers: Vec<Arc<dyn Subscribe>>,
    reporter: Option<Arc<dyn Report>>,
}

impl ExecutionBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RuntimeConfig) -> Self {
        Self {
            cfg,
            deployment: PolicyOverride::default(),
            subscribers: Vec::new(),
            reporter: None,
        }
    }

    /// Sets the deployment-wide retry snapshot directly.
    pub fn with_deployment_override(mut self, deployment: PolicyOverride) -> Self {
        self.deployment = deployment;
        self
    }

    /// Validates and captures the deployment's workflow retry settings.
    pub fn with_deployment_config(mut self, cfg: &DeploymentConfig) -> Result<Self, ConfigError> {
        self.deployment = cfg.to_override()?;
        Ok(self)
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the workflow reporter receiving terminal outcomes.
    pub fn with_reporter(mut self, reporter: Arc<dyn Report>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Builds the execution. Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Execution> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let reporter = self.reporter.unwrap_or_else(|| Arc::new(NoopReport));
        let token = CancellationToken::new();
        let listener = CancellationToken::new();

        subscriber_listener(&bus, Arc::clone(&subs), listener.clone());

        Arc::new(Execution::new_internal(
            self.cfg,
            self.deployment,
            bus,
            subs,
            reporter,
            token,
            listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until the execution is dropped.
///
/// Buffered events are delivered before the listener stops.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>, stop: CancellationToken) {
    if set.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }
    });
}
