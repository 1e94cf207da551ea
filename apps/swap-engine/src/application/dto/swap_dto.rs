//! Swap DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{Order, OrderFailureReason, OrderStatus};
use crate::domain::routing::VenueId;
use crate::domain::shared::{OrderId, PoolId, Timestamp, TokenAmount, TokenMint, TransactionHash};

/// Request to execute a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSwapRequestDto {
    /// Token being sold.
    pub token_in: String,
    /// Precision of `token_in`.
    pub token_in_decimal: u8,
    /// Token being bought.
    pub token_out: String,
    /// Precision of `token_out`.
    pub token_out_decimal: u8,
    /// Input amount in base units, decimal or `0x` hex.
    pub amount_in: String,
}

/// Response to a submitted swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSwapResponseDto {
    /// Id of the created order.
    pub order_id: OrderId,
}

/// Persisted view of an order.
///
/// Failed orders expose only the coarse reason, never the raw failure text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    /// Order id.
    pub order_id: OrderId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Token being sold.
    pub token_in: TokenMint,
    /// Precision of `token_in`.
    pub token_in_decimal: u8,
    /// Token being bought.
    pub token_out: TokenMint,
    /// Precision of `token_out`.
    pub token_out_decimal: u8,
    /// Requested input amount.
    pub amount_in: TokenAmount,
    /// Requested input in display units of `token_in`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_in_units: Option<Decimal>,
    /// Transaction signature, once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<TransactionHash>,
    /// Executing venue, once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<VenueId>,
    /// Executing pool, once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<PoolId>,
    /// Realized input, once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount_in: Option<TokenAmount>,
    /// Realized output, once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount_out: Option<TokenAmount>,
    /// Realized input in display units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount_in_units: Option<Decimal>,
    /// Realized output in display units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount_out_units: Option<Decimal>,
    /// Confirmation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<Timestamp>,
    /// Failure reason, once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<OrderFailureReason>,
    /// Creation time.
    pub created_at: Timestamp,
}

impl OrderDto {
    /// Create from domain Order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        let completion = order.completion();
        let in_decimals = order.token_in_decimals();
        let out_decimals = order.token_out_decimals();
        Self {
            order_id: order.id().clone(),
            status: order.status(),
            token_in: order.token_in().clone(),
            token_in_decimal: order.token_in_decimals(),
            token_out: order.token_out().clone(),
            token_out_decimal: order.token_out_decimals(),
            amount_in: order.amount_in(),
            amount_in_units: order.amount_in().to_decimal_units(in_decimals),
            transaction_hash: completion.map(|c| c.transaction_hash.clone()),
            venue_id: completion.map(|c| c.venue_id),
            pool_id: completion.map(|c| c.pool_id.clone()),
            final_amount_in: completion.map(|c| c.final_amount_in),
            final_amount_out: completion.map(|c| c.final_amount_out),
            final_amount_in_units: completion
                .and_then(|c| c.final_amount_in.to_decimal_units(in_decimals)),
            final_amount_out_units: completion
                .and_then(|c| c.final_amount_out.to_decimal_units(out_decimals)),
            confirmed_at: completion.map(|c| c.confirmed_at),
            failure_reason: order.failure_reason(),
            created_at: order.created_at(),
        }
    }
}
