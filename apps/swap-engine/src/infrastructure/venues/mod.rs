//! Venue Adapters
//!
//! Implementations of the `Dex` capability.

mod simulated;

pub use simulated::{SimulatedDex, SimulatedDexConfig, SimulatedPool};
