//! # Task abstractions and specifications.
//!
//! - [`Task`] - trait for one async, cancelable invocation
//! - [`TaskFn`] - closure-backed implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskSpec`] / [`TaskSpecBuilder`] - task plus operation-level retry settings
//! - [`TaskId`], [`AttemptContext`] - identity and per-attempt context

mod context;
mod id;
mod spec;
mod spec_builder;
mod task;
mod task_fn;

pub use context::AttemptContext;
pub use id::TaskId;
pub use spec::TaskSpec;
pub use spec_builder::TaskSpecBuilder;
pub use task::Task;
pub use task_fn::{TaskFn, TaskRef};
