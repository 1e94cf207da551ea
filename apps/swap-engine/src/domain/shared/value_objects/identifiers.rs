//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up order ids, job ids and transaction hashes.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Unique identifier for a swap order.");
define_id!(
    JobId,
    "Queue job identifier. Derived deterministically from the order id."
);
define_id!(PoolId, "Venue pool or market address.");
define_id!(TransactionHash, "On-chain transaction signature.");

impl OrderId {
    /// Generate a new unique identifier using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl JobId {
    /// Prefix shared by every execute-order job. Relays and the progress
    /// buffer depend on it to correlate queue events with orders.
    pub const EXECUTE_ORDER_PREFIX: &'static str = "execute_order_";

    /// Build the job id for executing the given order.
    #[must_use]
    pub fn for_order(order_id: &OrderId) -> Self {
        Self(format!("{}{}", Self::EXECUTE_ORDER_PREFIX, order_id))
    }

    /// Extract the owning order id, if this is an execute-order job.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.0
            .strip_prefix(Self::EXECUTE_ORDER_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(OrderId::new)
    }
}
