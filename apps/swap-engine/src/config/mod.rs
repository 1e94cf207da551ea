//! Configuration module for the swap engine.
//!
//! Loads a YAML file, interpolates environment variables, and validates the
//! result before any component is built from it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use swap_engine::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod observability;
mod progress;
mod queue;
mod routing;
mod server;
mod venues;
mod wallet;

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use observability::ObservabilityConfig;
pub use progress::ProgressConfig;
pub use queue::QueueConfig;
pub use routing::RoutingConfig;
pub use server::ServerConfig;
pub use venues::VenueConfig;
pub use wallet::WalletConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Best-quote routing configuration.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Job queue and worker configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Progress replay buffer configuration.
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Signing wallet.
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Enabled venues, in routing order.
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ValidationError` naming the first offending field, or
/// `MissingEnvVar` when the wallet public key was not provided.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.wallet.public_key.trim().is_empty() {
        return Err(ConfigError::MissingEnvVar("WALLET_PUBLIC_KEY".to_string()));
    }

    if config.routing.quote_timeout_ms == 0 {
        return Err(invalid("routing.quote_timeout_ms must be positive"));
    }

    validate_queue(&config.queue)?;
    validate_progress(&config.progress)?;
    validate_venues(&config.venues)?;

    Ok(())
}

fn validate_queue(queue: &QueueConfig) -> Result<(), ConfigError> {
    if queue.attempts == 0 {
        return Err(invalid("queue.attempts must be at least 1"));
    }
    if queue.concurrency == 0 {
        return Err(invalid("queue.concurrency must be at least 1"));
    }
    if queue.event_capacity == 0 {
        return Err(invalid("queue.event_capacity must be positive"));
    }
    if queue.initial_backoff_ms > queue.max_backoff_ms {
        return Err(invalid(
            "queue.initial_backoff_ms must not exceed queue.max_backoff_ms",
        ));
    }
    if queue.backoff_multiplier < 1.0 {
        return Err(invalid("queue.backoff_multiplier must be at least 1.0"));
    }
    if !(0.0..=1.0).contains(&queue.jitter_factor) {
        return Err(invalid("queue.jitter_factor must be between 0.0 and 1.0"));
    }
    Ok(())
}

fn validate_progress(progress: &ProgressConfig) -> Result<(), ConfigError> {
    if progress.max_events_per_order == 0 {
        return Err(invalid("progress.max_events_per_order must be positive"));
    }
    if progress.max_age_ms == 0 || progress.sweep_interval_ms == 0 {
        return Err(invalid(
            "progress.max_age_ms and progress.sweep_interval_ms must be positive",
        ));
    }
    Ok(())
}

fn validate_venues(venues: &[VenueConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for venue in venues {
        if !seen.insert(venue.id) {
            return Err(ConfigError::ValidationError(format!(
                "venue '{}' is configured more than once",
                venue.id
            )));
        }
        if venue.slippage_tolerance < Decimal::ZERO || venue.slippage_tolerance >= Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "venues[{}].slippage_tolerance must be in [0, 1)",
                venue.id
            )));
        }
        if venue.realized_output_factor <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "venues[{}].realized_output_factor must be positive",
                venue.id
            )));
        }
        for pool in &venue.pools {
            if pool.reserve_a == 0 || pool.reserve_b == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "pool '{}' must have non-zero reserves",
                    pool.pool_id
                )));
            }
            if pool.fee_bps >= 10_000 {
                return Err(ConfigError::ValidationError(format!(
                    "pool '{}' fee_bps must be below 10000",
                    pool.pool_id
                )));
            }
        }
    }
    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
