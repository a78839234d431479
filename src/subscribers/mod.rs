//! # Event subscribers.
//!
//! ```text
//! TaskActor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                         ├──► LogWriter (tracing)
//!                                                         ├──► Metrics
//!                                                         └──► Custom ...
//! ```
//!
//! Implement [`Subscribe`] to forward retry activity to a deployment-events store,
//! metrics, or alerting.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
