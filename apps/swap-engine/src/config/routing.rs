//! Routing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::routing::{RouterConfig, VenueFailurePolicy};

/// Best-quote routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Per-venue quote deadline in milliseconds.
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    /// Whether one failing venue fails the whole routing call.
    #[serde(default)]
    pub venue_failure_policy: VenueFailurePolicy,
}

impl RoutingConfig {
    /// Router settings derived from this section.
    #[must_use]
    pub const fn router_config(&self) -> RouterConfig {
        RouterConfig {
            quote_timeout: Duration::from_millis(self.quote_timeout_ms),
            failure_policy: self.venue_failure_policy,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            quote_timeout_ms: default_quote_timeout_ms(),
            venue_failure_policy: VenueFailurePolicy::default(),
        }
    }
}

const fn default_quote_timeout_ms() -> u64 {
    10_000
}
