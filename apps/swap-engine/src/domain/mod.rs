//! Domain Layer
//!
//! Business rules with no infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Swap order lifecycle
//! - [`routing`]: Venue capability, registry and best-quote selection

pub mod order_execution;
pub mod routing;
pub mod shared;
