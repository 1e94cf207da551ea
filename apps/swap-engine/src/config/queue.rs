//! Job queue and worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::ports::DEFAULT_JOB_ATTEMPTS;
use crate::application::use_cases::RetryPolicy;
use crate::infrastructure::queue::{
    DEFAULT_CONCURRENCY, DEFAULT_EVENT_CAPACITY, RetryBackoff, WorkerConfig,
};

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Attempts granted to each execution job.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// When a failed attempt counts as the last one.
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for a retry delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth per attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter factor (0.2 = ±20%).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
    /// Capacity of the queue event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl QueueConfig {
    /// Backoff policy derived from this section.
    #[must_use]
    pub const fn backoff(&self) -> RetryBackoff {
        RetryBackoff {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
        }
    }

    /// Worker pool settings derived from this section.
    #[must_use]
    pub const fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            concurrency: self.concurrency,
            backoff: self.backoff(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            concurrency: default_concurrency(),
            retry_policy: RetryPolicy::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
            event_capacity: default_event_capacity(),
        }
    }
}

const fn default_attempts() -> u32 {
    DEFAULT_JOB_ATTEMPTS
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}

const fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}
