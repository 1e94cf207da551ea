//! Observability configuration for logging and metrics.

use serde::{Deserialize, Serialize};

use crate::observability::{MetricsConfig, TracingConfig};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: TracingConfig,
    /// Prometheus exporter configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}
