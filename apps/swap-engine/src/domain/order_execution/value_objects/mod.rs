//! Order execution value objects.

mod failure_reason;
mod order_status;

pub use failure_reason::OrderFailureReason;
pub use order_status::OrderStatus;
