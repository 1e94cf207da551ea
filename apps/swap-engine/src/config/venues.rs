//! Venue configuration.
//!
//! Each entry enables one venue and describes the simulated pools it quotes.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::routing::VenueId;
use crate::infrastructure::venues::{SimulatedDexConfig, SimulatedPool};

/// One enabled venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Venue identifier.
    pub id: VenueId,
    /// Artificial latency of each quote call in milliseconds.
    #[serde(default)]
    pub quote_latency_ms: u64,
    /// Fraction the guaranteed minimum may fall below the quoted output.
    #[serde(default = "default_slippage_tolerance")]
    pub slippage_tolerance: Decimal,
    /// Realized output as a fraction of the quoted output.
    #[serde(default = "default_realized_output_factor")]
    pub realized_output_factor: Decimal,
    /// Pools quoted by this venue.
    #[serde(default)]
    pub pools: Vec<SimulatedPool>,
}

impl VenueConfig {
    /// Adapter settings derived from this entry.
    #[must_use]
    pub fn simulated_config(&self) -> SimulatedDexConfig {
        SimulatedDexConfig {
            pools: self.pools.clone(),
            quote_latency: Duration::from_millis(self.quote_latency_ms),
            slippage_tolerance: self.slippage_tolerance,
            realized_output_factor: self.realized_output_factor,
        }
    }
}

fn default_slippage_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

const fn default_realized_output_factor() -> Decimal {
    Decimal::ONE
}
