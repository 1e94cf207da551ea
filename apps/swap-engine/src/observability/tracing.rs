//! Structured logging and optional OpenTelemetry export.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter`, either a
//! JSON or a human-readable formatter, and, when `otlp` is configured, an
//! OTLP span exporter.
//!
//! # Key Fields
//!
//! - `order_id` - Order correlation across routing, execution and relay
//! - `job_id` - Queue job identifier
//! - `venue` - Venue adapter id
//! - `pool_id` - Selected pool

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider};
use serde::{Deserialize, Serialize};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "swap_engine=info";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub default_filter: String,
    /// Span export; disabled when absent.
    #[serde(default)]
    pub otlp: Option<OtlpConfig>,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_filter: default_filter(),
            otlp: None,
        }
    }
}

/// OTLP span exporter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtlpConfig {
    /// Collector endpoint (gRPC).
    #[serde(default = "default_otlp_endpoint")]
    pub endpoint: String,
    /// `service.name` resource attribute.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Maximum batch size for span export.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between batch exports in milliseconds.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "swap-engine".to_string()
}

const fn default_batch_size() -> usize {
    512
}

const fn default_batch_timeout_ms() -> u64 {
    5000
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
        }
    }
}

/// Tracing initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to create OTLP exporter.
    #[error("failed to create OTLP exporter: {0}")]
    ExporterError(String),
    /// A global subscriber was already installed.
    #[error("subscriber error: {0}")]
    SubscriberError(String),
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured default.
///
/// # Errors
///
/// Returns `TracingError::Filter` if the configured default does not parse.
pub fn build_filter(config: &TracingConfig) -> Result<EnvFilter, TracingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.default_filter)
            .map_err(|e| TracingError::Filter(e.to_string())),
    }
}

/// Tracer provider handle for graceful shutdown.
#[derive(Default)]
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    /// Flush pending spans and stop the exporter. No-op without OTLP.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider
            && let Err(e) = provider.shutdown()
        {
            tracing::error!(error = %e, "Failed to shutdown tracer provider");
        }
    }
}

fn build_provider(config: &OtlpConfig) -> Result<SdkTracerProvider, TracingError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| TracingError::ExporterError(e.to_string()))?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let batch_processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            BatchConfigBuilder::default()
                .with_max_export_batch_size(config.batch_size)
                .with_scheduled_delay(Duration::from_millis(config.batch_timeout_ms))
                .build(),
        )
        .build();

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_span_processor(batch_processor)
        .build())
}

/// Install the global subscriber.
///
/// Hold the returned guard until shutdown so exported spans are flushed.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the OTLP exporter cannot be
/// built, or a subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    let filter = build_filter(config)?;

    let provider = config.otlp.as_ref().map(build_provider).transpose()?;
    let otel_layer = match (&provider, &config.otlp) {
        (Some(provider), Some(otlp)) => {
            Some(OpenTelemetryLayer::new(provider.tracer(otlp.service_name.clone())))
        }
        _ => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);

    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    result.map_err(|e| TracingError::SubscriberError(e.to_string()))?;

    match &config.otlp {
        Some(otlp) => tracing::info!(
            format = ?config.format,
            endpoint = %otlp.endpoint,
            service = %otlp.service_name,
            "Logging initialized with OpenTelemetry export"
        ),
        None => tracing::info!(format = ?config.format, "Logging initialized"),
    }
    Ok(TracingGuard { provider })
}
