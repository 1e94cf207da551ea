//! Observability module for metrics and structured logging.

mod metrics;
mod tracing;

pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_execution_result, record_routing_outcome,
    update_buffered_orders,
};
pub use self::tracing::{
    DEFAULT_FILTER, LogFormat, OtlpConfig, TracingConfig, TracingError, TracingGuard, init_tracing,
};
