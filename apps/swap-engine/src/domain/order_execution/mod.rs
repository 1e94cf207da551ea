//! Order Execution Bounded Context
//!
//! Owns the swap order entity and its single-use terminal transitions.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: starts `Pending`, ends `Confirmed` or `Failed`
//! - **Failure Reason**: the coarse classification persisted on failure

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order, ReconstitutedOrderParams, SwapCompletion};
pub use errors::OrderError;
pub use repository::OrderRepository;
pub use value_objects::{OrderFailureReason, OrderStatus};
