//! Prometheus metrics for the swap engine.
//!
//! # Example
//!
//! ```ignore
//! use swap_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_routing_outcome("quoted", 0.42);
//! ```

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to start the exporter.
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind the metrics HTTP listener.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Histogram buckets for routing latency (in seconds).
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090))
}

fn default_latency_buckets() -> Vec<f64> {
    // 10ms to the 10s quote deadline
    vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_listen_addr(),
            latency_buckets: default_latency_buckets(),
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter started");

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Swap Metrics
// ============================================================================

/// Record one routing decision.
///
/// # Arguments
///
/// * `outcome` - `"quoted"`, `"no_quote"` or `"error"`
/// * `latency_seconds` - Wall time of the whole fan-out
pub fn record_routing_outcome(outcome: &'static str, latency_seconds: f64) {
    counter!("swap_routing_total", "outcome" => outcome).increment(1);
    histogram!("swap_routing_duration_seconds").record(latency_seconds);
}

/// Record a finished execution attempt.
///
/// # Arguments
///
/// * `result` - `"confirmed"` or a failure reason such as `"slippage"`
/// * `venue` - Venue that executed, or `"none"` when routing failed
pub fn record_execution_result(result: &'static str, venue: &'static str) {
    counter!("swap_execution_total", "result" => result, "venue" => venue).increment(1);
}

/// Update the number of orders with buffered progress events.
pub fn update_buffered_orders(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("swap_progress_buffered_orders").set(count as f64);
}
