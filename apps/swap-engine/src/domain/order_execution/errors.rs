//! Order execution errors.

use std::fmt;

use super::value_objects::OrderStatus;

/// Errors that can occur in the order lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A terminal transition was attempted on an order that already left `Pending`.
    AlreadyCompleted {
        /// Order ID.
        order_id: String,
        /// Status the order already holds.
        status: OrderStatus,
    },

    /// Invalid order parameters.
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Order not found.
    NotFound {
        /// Order ID.
        order_id: String,
    },

    /// Storage backend failure.
    Storage {
        /// Error message.
        message: String,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCompleted { order_id, status } => {
                write!(f, "Order {order_id} has already completed (status: {status})")
            }
            Self::InvalidParameters { field, message } => {
                write!(f, "Invalid order parameter '{field}': {message}")
            }
            Self::NotFound { order_id } => {
                write!(f, "Order not found: {order_id}")
            }
            Self::Storage { message } => {
                write!(f, "Order storage error: {message}")
            }
        }
    }
}

impl std::error::Error for OrderError {}
