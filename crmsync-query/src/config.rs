//! Cache and retry configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff for reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retry.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Adds up to 25% random delay on top of each backoff.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy making a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (0-based: the delay after the
    /// first failure is `backoff_for_attempt(0)`). A delay that is not a
    /// finite, non-negative number of seconds becomes `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let mut backoff = Duration::try_from_secs_f64(base)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff));

        if self.jitter {
            let factor = 1.0 + rand::random::<f64>() * 0.25;
            backoff = Duration::try_from_secs_f64(backoff.as_secs_f64() * factor)
                .unwrap_or(self.max_backoff);
        }

        backoff.min(self.max_backoff)
    }
}

/// Defaults applied to every query created through a [`QueryClient`](crate::QueryClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// How long fetched data counts as fresh.
    pub stale_time: Duration,
    pub retry: RetryPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}
