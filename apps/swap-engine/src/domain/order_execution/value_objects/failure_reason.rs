//! Coarse failure reason persisted on failed orders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an order ended in `Failed`.
///
/// Observers get the raw failure message over the progress stream; storage
/// only keeps this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderFailureReason {
    /// No venue produced a usable quote.
    NoPoolsFound,
    /// Realized price moved beyond tolerance.
    Slippage,
    /// Any other on-chain or network failure.
    TransactionFailed,
}

impl OrderFailureReason {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoPoolsFound => "no_pools_found",
            Self::Slippage => "slippage",
            Self::TransactionFailed => "transaction_failed",
        }
    }
}

impl fmt::Display for OrderFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
