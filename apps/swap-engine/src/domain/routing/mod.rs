//! Routing Bounded Context
//!
//! Venue capability, the fixed venue registry, and best-quote selection.

pub mod dex;
pub mod quote;
pub mod registry;
pub mod router;
pub mod venue;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use dex::{ConfirmationResult, Dex, DexError};
pub use quote::Quote;
pub use registry::{DexRegistry, RegistryError};
pub use router::{
    DEFAULT_QUOTE_TIMEOUT, DexRouter, RouterConfig, RoutingError, VenueFailurePolicy,
};
pub use venue::{UnknownVenue, VenueId};
pub use wallet::WalletCredentials;
