//! Runtime core: retry state machine, scheduling and execution lifecycle.
//!
//! The public entry point is [`Execution`]; the state machine and scheduler are public too
//! so hosts with their own task loop can drive them directly.
//!
//! Internal modules:
//! - [`machine`]: per-task state and the retry decision;
//! - [`scheduler`]: timer-driven, cancellable re-submission;
//! - [`runner`]: executes one attempt with timeout and classification;
//! - [`actor`]: runs a single task through its retry loop;
//! - [`registry`]: live actors of an execution;
//! - [`report`]: workflow reporting and final summaries;
//! - [`execution`] / [`builder`]: wiring, cancellation and grace-bounded wait.

mod actor;
mod builder;
mod config;
mod execution;
mod machine;
mod registry;
mod report;
mod runner;
mod scheduler;

pub use builder::ExecutionBuilder;
pub use config::RuntimeConfig;
pub use execution::Execution;
pub use machine::{
    AbortReason, AttemptOutcome, InvalidTransition, TaskRetryState, TaskStatus, Transition,
};
pub use report::{ExecutionReport, NoopReport, Report, TaskReport};
pub use scheduler::RetryScheduler;
