//! Progress buffer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::ProgressBufferConfig;

/// Replay buffer limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Events kept per order.
    #[serde(default = "default_max_events_per_order")]
    pub max_events_per_order: usize,
    /// Event time-to-live in milliseconds.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
    /// Expiry sweep period in milliseconds.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl ProgressConfig {
    /// Buffer settings derived from this section.
    #[must_use]
    pub const fn buffer_config(&self) -> ProgressBufferConfig {
        ProgressBufferConfig {
            max_events_per_order: self.max_events_per_order,
            max_age: Duration::from_millis(self.max_age_ms),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            max_events_per_order: default_max_events_per_order(),
            max_age_ms: default_max_age_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

const fn default_max_events_per_order() -> usize {
    100
}

const fn default_max_age_ms() -> u64 {
    5 * 60 * 1000
}

const fn default_sweep_interval_ms() -> u64 {
    60_000
}
