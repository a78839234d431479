//! # retryvisor
//!
//! **Retryvisor** is the retry/backoff control core of a workflow orchestrator.
//!
//! When an operation (install, configure, health poll) fails, it decides without user
//! intervention whether to retry it, after how long, and when to give up and report the
//! task as aborted. Only terminal outcomes are surfaced to the surrounding workflow engine.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   DeploymentConfig            TaskSpec            TaskSpec
//!  (snapshot, once)        (operation override)  (budget-exempt)
//!          │                       │                   │
//!          ▼                       ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Execution (one workflow run)                                     │
//! │  - resolve(default < deployment < operation) once per task        │
//! │  - Registry (task actors by id)                                   │
//! │  - RetryScheduler (timer per pending retry, cancellable)          │
//! │  - Bus + SubscriberSet (observability)                            │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TaskActor   │   │  TaskActor   │   │  TaskActor   │
//!     │ TaskRetry-   │   │ TaskRetry-   │   │ TaskRetry-   │
//!     │ State        │   │ State        │   │ State        │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ invoke()         │                  │
//!            ▼                  ▼                  ▼
//!       Ok / TaskError ──► classify() ──► FailureOutcome
//!                                           ├─ NonRecoverable ─► Aborted ─► Report
//!                                           └─ Recoverable ─► budget left?
//!                                                 ├─ yes ─► RetryScheduler (delay ≥ interval)
//!                                                 └─ no  ─► Aborted ─► Report
//! ```
//!
//! ### Failure classification
//! ```text
//! TaskError::NonRecoverable          ─► NonRecoverable (abort now, whatever budget remains)
//! TaskError::Recoverable{retry_after} ─► Recoverable (retry_after beats the policy interval)
//! Unclassified / Timeout / Canceled  ─► Recoverable
//! TaskError::Remote(bytes)           ─► decoded outcome, or Recoverable if undecodable
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                                |
//! |-------------------|-------------------------------------------------------------------|---------------------------------------------------|
//! | **Policies**      | Retry count/interval, override layers, exemption, jitter.         | [`RetryPolicy`], [`resolve`], [`RetryBudget`]     |
//! | **Classification**| Tagged failure outcomes and their wire encoding.                  | [`FailureOutcome`], [`classify`], [`decode_or_recoverable`] |
//! | **State machine** | Per-task retry decision.                                          | [`TaskRetryState`], [`Transition`], [`AbortReason`] |
//! | **Scheduling**    | Non-blocking, cancellable delayed re-submission.                  | [`RetryScheduler`]                                |
//! | **Execution**     | Submit, cancel, wait with grace.                                  | [`Execution`], [`ExecutionReport`], [`Report`]    |
//! | **Subscriber API**| Hook into runtime events (logging, audit, metrics).               | [`Subscribe`], [`Event`]                          |
//! | **Tasks**         | Define tasks as trait objects or closures.                        | [`Task`], [`TaskFn`], [`TaskSpec`]                |
//! | **Errors**        | Typed errors for tasks and the runtime.                           | [`TaskError`], [`RuntimeError`]                   |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber rendering events via `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use retryvisor::{
//!     AttemptContext, Execution, MaxRetries, RecoverableError, RuntimeConfig, TaskError,
//!     TaskSpec, TaskStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn retryvisor::Subscribe>> = vec![Arc::new(retryvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn retryvisor::Subscribe>> = Vec::new();
//!
//!     let exec = Execution::builder(RuntimeConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // Operation declares its own retries; the second attempt asks for a short delay.
//!     let spec = TaskSpec::builder("node_1.configure")
//!         .max_retries(MaxRetries::Limited(2))
//!         .retry_interval(Duration::from_millis(10))
//!         .build(|ctx: AttemptContext| async move {
//!             if ctx.attempt == 1 {
//!                 let err = RecoverableError::new("lock held").with_retry_after(Duration::from_millis(1));
//!                 return Err(TaskError::from(err));
//!             }
//!             Ok(())
//!         });
//!
//!     exec.submit(spec).await?;
//!     let report = exec.wait().await?;
//!     assert_eq!(report.get("node_1.configure").map(|t| t.status), Some(TaskStatus::Succeeded));
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod outcome;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{
    AbortReason, AttemptOutcome, Execution, ExecutionBuilder, ExecutionReport, InvalidTransition,
    NoopReport, Report, RetryScheduler, RuntimeConfig, TaskReport, TaskRetryState, TaskStatus,
    Transition,
};
pub use error::{
    CodecError, ConfigError, NonRecoverableError, RecoverableError, RuntimeError, ScheduleError,
    TaskError,
};
pub use events::{Bus, Event, EventKind};
pub use outcome::{
    FailureKind, FailureOutcome, WIRE_VERSION, classify, decode, decode_or_recoverable, encode,
    encode_error,
};
pub use policies::{
    DeploymentConfig, JitterPolicy, MaxRetries, OperationRetry, PolicyOverride, RetryBudget,
    RetryPolicy, resolve,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{AttemptContext, Task, TaskFn, TaskId, TaskRef, TaskSpec, TaskSpecBuilder};

// Optional: built-in subscriber rendering events through `tracing`.
// Enabled by default via the `logging` feature.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
