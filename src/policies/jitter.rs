//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] spreads retries of many tasks that failed together (e.g. after a
//! shared dependency went down) so they do not hit the dependency in lockstep.
//!
//! Jitter here is **additive**: the retry interval is a lower bound and a retry never
//! fires earlier than it, so randomness is only ever added on top.
//!
//! - [`JitterPolicy::None`]: exact interval
//! - [`JitterPolicy::Full`]: interval + random[0, interval]
//! - [`JitterPolicy::Equal`]: interval + random[0, interval/2]

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact interval.
    #[default]
    None,

    /// Up to one extra interval.
    Full,

    /// Up to half an extra interval.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to `delay`. The result is never below `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let spread = match self {
            JitterPolicy::None => return delay,
            JitterPolicy::Full => ms,
            JitterPolicy::Equal => ms / 2,
        };
        if spread == 0 {
            return delay;
        }
        let extra = rand::rng().random_range(0..=spread);
        delay.saturating_add(Duration::from_millis(extra))
    }
}
