//! Venue quotes.

use serde::{Deserialize, Serialize};

use super::VenueId;
use crate::domain::shared::{PoolId, TokenAmount};

/// A venue's priced offer for one (token in, token out, amount) query.
///
/// Valid only for the routing decision it was fetched for; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Venue that produced the quote.
    pub venue_id: VenueId,
    /// Pool or market the quote is for.
    pub pool_id: PoolId,
    /// Input amount excluding fees.
    pub input_amount: TokenAmount,
    /// Input amount including all fees.
    pub input_amount_with_fees: TokenAmount,
    /// Expected output amount.
    pub output_amount: TokenAmount,
    /// Minimum acceptable output amount.
    pub min_output_amount: TokenAmount,
}
