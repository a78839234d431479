//! # Example: retry_budget
//!
//! Demonstrates how one execution resolves retry budgets for different tasks.
//!
//! Shows how to:
//! - Capture the deployment's `task_retries` / `task_retry_interval` from a manager context
//! - Let an operation override the deployment settings
//! - Run a budget-exempt status poll that keeps its own bound
//! - Read terminal outcomes from the [`ExecutionReport`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► DeploymentConfig::from_context(ctx)     task_retries=1, interval=200ms
//!   ├─► submit "node_1.create"                  deployment budget, fails once
//!   ├─► submit "node_1.configure"               operation: max_retries=0, non-recoverable
//!   ├─► submit "node_1.wait_started"            exempt: up to 10 retries every 100ms
//!   └─► wait()
//!         ├─► node_1.create        Succeeded after 2 invocations
//!         ├─► node_1.configure     Aborted (non-recoverable)
//!         └─► node_1.wait_started  Succeeded after 6 invocations
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example retry_budget
//! ```

use std::sync::Arc;
use std::time::Duration;

use retryvisor::{
    AttemptContext, DeploymentConfig, Execution, MaxRetries, OperationRetry, RetryBudget,
    RuntimeConfig, Subscribe, TaskError, TaskSpec,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    println!("=== retry_budget example ===\n");

    // 1. Deployment-wide settings, captured once for the whole execution
    let ctx = serde_json::json!({
        "cloudify": { "workflows": { "task_retries": 1, "task_retry_interval": 0.2 } }
    });
    let deployment = DeploymentConfig::from_context(&ctx)?;

    // 2. Optional: log runtime events (requires "logging" feature)
    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(retryvisor::LogWriter)];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    let exec = Execution::builder(RuntimeConfig::default())
        .with_deployment_config(&deployment)?
        .with_subscribers(subs)
        .build();

    // 3. Uses the deployment budget: one retry after 200ms
    let create = TaskSpec::builder("node_1.create").build(|ctx: AttemptContext| async move {
        if ctx.is_first_attempt() {
            return Err(TaskError::recoverable("vm not allocated yet"));
        }
        Ok(())
    });

    // 4. Operation declares no retries; the failure is fatal anyway
    let no_retries = OperationRetry {
        max_retries: Some(0),
        retry_interval: None,
    };
    let configure = TaskSpec::builder("node_1.configure")
        .operation_retry(&no_retries)?
        .build(|_ctx: AttemptContext| async move {
            Err::<(), _>(TaskError::non_recoverable("invalid plugin configuration"))
        });

    // 5. Status poll: exempt from the deployment budget, polls every 100ms
    let wait_started = TaskSpec::builder("node_1.wait_started")
        .budget(RetryBudget::Exempt {
            max_retries: MaxRetries::Limited(10),
            interval: Some(Duration::from_millis(100)),
        })
        .build(|ctx: AttemptContext| async move {
            if ctx.attempt < 6 {
                return Err(TaskError::recoverable("service not started"));
            }
            Ok(())
        });

    for spec in [create, configure, wait_started] {
        let policy = exec.submit(spec).await?;
        println!("submitted with max_retries={}", policy.max_retries);
    }

    // 6. Terminal outcomes
    let report = exec.wait().await?;
    println!();
    for task in report.iter() {
        match &task.abort {
            Some(reason) => println!("{:<22} {:?}: {reason}", task.id, task.status),
            None => println!(
                "{:<22} {:?} after {} invocation(s)",
                task.id, task.status, task.invocations
            ),
        }
    }
    Ok(())
}
