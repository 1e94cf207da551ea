//! Exponential backoff with jitter between job attempts.
//!
//! # Example
//!
//! ```rust,ignore
//! let backoff = RetryBackoff::default();
//! let first = backoff.delay_for(0);  // ~1s with jitter
//! let second = backoff.delay_for(1); // ~2s with jitter
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Backoff policy applied before re-running a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryBackoff {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any delay.
    pub max_backoff: Duration,
    /// Growth factor per attempt.
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryBackoff {
    /// Delay before the attempt that follows `attempts_made` failures.
    #[must_use]
    pub fn delay_for(&self, attempts_made: u32) -> Duration {
        let base_ms = self.base_backoff_ms(attempts_made);
        let jittered_ms = self.apply_jitter(base_ms);
        Duration::from_millis(jittered_ms.min(self.max_backoff_ms()))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn max_backoff_ms(&self) -> u64 {
        self.max_backoff.as_millis() as u64
    }

    /// Exponential backoff without jitter.
    fn base_backoff_ms(&self, attempts_made: u32) -> u64 {
        let exponent = i32::try_from(attempts_made).unwrap_or(i32::MAX);
        let multiplier = self.backoff_multiplier.powi(exponent);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let backoff = (self.initial_backoff.as_millis() as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms())
    }

    /// Uniform in `[backoff * (1 - jitter), backoff * (1 + jitter)]`.
    #[allow(clippy::cast_precision_loss)]
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        if jitter_range <= 0.0 {
            return backoff_ms;
        }
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jittered = rand::rng().random_range(min..=max) as u64;
        jittered
    }
}
