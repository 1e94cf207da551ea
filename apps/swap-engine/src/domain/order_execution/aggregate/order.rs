//! Order Aggregate Root
//!
//! The Order aggregate owns a swap's lifecycle. It starts `Pending` and
//! leaves that state exactly once, through `mark_as_confirmed` or
//! `mark_as_failed`.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::{OrderFailureReason, OrderStatus};
use crate::domain::routing::VenueId;
use crate::domain::shared::{
    OrderId, PoolId, Timestamp, TokenAmount, TokenMint, TransactionHash,
};

/// Largest token precision accepted. Matches the scale limit of `Decimal`.
pub const MAX_TOKEN_DECIMALS: u8 = 28;

/// Command to create a new swap order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Token being sold.
    pub token_in: TokenMint,
    /// Precision of `token_in`.
    pub token_in_decimals: u8,
    /// Token being bought.
    pub token_out: TokenMint,
    /// Precision of `token_out`.
    pub token_out_decimals: u8,
    /// Amount of `token_in` to sell, in base units.
    pub amount_in: TokenAmount,
}

impl CreateOrderCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns error if the pair is degenerate, the amount is zero or a
    /// precision is out of range.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.token_in == self.token_out {
            return Err(OrderError::InvalidParameters {
                field: "token_out".to_string(),
                message: "token_out must differ from token_in".to_string(),
            });
        }

        if self.amount_in.is_zero() {
            return Err(OrderError::InvalidParameters {
                field: "amount_in".to_string(),
                message: "amount must be greater than zero".to_string(),
            });
        }

        for (field, decimals) in [
            ("token_in_decimals", self.token_in_decimals),
            ("token_out_decimals", self.token_out_decimals),
        ] {
            if decimals > MAX_TOKEN_DECIMALS {
                return Err(OrderError::InvalidParameters {
                    field: field.to_string(),
                    message: format!("precision cannot exceed {MAX_TOKEN_DECIMALS}"),
                });
            }
        }

        Ok(())
    }
}

/// Parameters for reconstituting an Order from storage.
#[derive(Debug, Clone)]
pub struct ReconstitutedOrderParams {
    /// Order identifier.
    pub id: OrderId,
    /// Current status.
    pub status: OrderStatus,
    /// Token being sold.
    pub token_in: TokenMint,
    /// Precision of `token_in`.
    pub token_in_decimals: u8,
    /// Token being bought.
    pub token_out: TokenMint,
    /// Precision of `token_out`.
    pub token_out_decimals: u8,
    /// Requested input amount.
    pub amount_in: TokenAmount,
    /// Completion details, present once confirmed.
    pub completion: Option<SwapCompletion>,
    /// Failure reason, present once failed.
    pub failure_reason: Option<OrderFailureReason>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Realized outcome of a confirmed swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCompletion {
    /// Transaction signature.
    pub transaction_hash: TransactionHash,
    /// Venue that executed the swap.
    pub venue_id: VenueId,
    /// Pool the swap went through.
    pub pool_id: PoolId,
    /// Realized input delta.
    pub final_amount_in: TokenAmount,
    /// Realized output delta.
    pub final_amount_out: TokenAmount,
    /// When the order was confirmed.
    pub confirmed_at: Timestamp,
}

/// Order Aggregate Root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    status: OrderStatus,
    token_in: TokenMint,
    token_in_decimals: u8,
    token_out: TokenMint,
    token_out_decimals: u8,
    amount_in: TokenAmount,
    completion: Option<SwapCompletion>,
    failure_reason: Option<OrderFailureReason>,
    created_at: Timestamp,
}

impl Order {
    /// Create a new pending order with a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn create(cmd: CreateOrderCommand) -> Result<Self, OrderError> {
        cmd.validate()?;

        Ok(Self {
            id: OrderId::generate(),
            status: OrderStatus::Pending,
            token_in: cmd.token_in,
            token_in_decimals: cmd.token_in_decimals,
            token_out: cmd.token_out,
            token_out_decimals: cmd.token_out_decimals,
            amount_in: cmd.amount_in,
            completion: None,
            failure_reason: None,
            created_at: Timestamp::now(),
        })
    }

    /// Reconstitute an order from stored state.
    #[must_use]
    pub fn reconstitute(params: ReconstitutedOrderParams) -> Self {
        Self {
            id: params.id,
            status: params.status,
            token_in: params.token_in,
            token_in_decimals: params.token_in_decimals,
            token_out: params.token_out,
            token_out_decimals: params.token_out_decimals,
            amount_in: params.amount_in,
            completion: params.completion,
            failure_reason: params.failure_reason,
            created_at: params.created_at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the input token.
    #[must_use]
    pub const fn token_in(&self) -> &TokenMint {
        &self.token_in
    }

    /// Get the input token precision.
    #[must_use]
    pub const fn token_in_decimals(&self) -> u8 {
        self.token_in_decimals
    }

    /// Get the output token.
    #[must_use]
    pub const fn token_out(&self) -> &TokenMint {
        &self.token_out
    }

    /// Get the output token precision.
    #[must_use]
    pub const fn token_out_decimals(&self) -> u8 {
        self.token_out_decimals
    }

    /// Get the requested input amount.
    #[must_use]
    pub const fn amount_in(&self) -> TokenAmount {
        self.amount_in
    }

    /// Get the completion details, if confirmed.
    #[must_use]
    pub const fn completion(&self) -> Option<&SwapCompletion> {
        self.completion.as_ref()
    }

    /// Get the failure reason, if failed.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<OrderFailureReason> {
        self.failure_reason
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Record a confirmed swap.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::AlreadyCompleted` if the order is not pending.
    pub fn mark_as_confirmed(
        &mut self,
        transaction_hash: TransactionHash,
        venue_id: VenueId,
        pool_id: PoolId,
        final_amount_in: TokenAmount,
        final_amount_out: TokenAmount,
    ) -> Result<(), OrderError> {
        self.ensure_pending()?;

        self.completion = Some(SwapCompletion {
            transaction_hash,
            venue_id,
            pool_id,
            final_amount_in,
            final_amount_out,
            confirmed_at: Timestamp::now(),
        });
        self.status = OrderStatus::Confirmed;

        Ok(())
    }

    /// Record a terminal failure.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::AlreadyCompleted` if the order is not pending.
    pub fn mark_as_failed(&mut self, reason: OrderFailureReason) -> Result<(), OrderError> {
        self.ensure_pending()?;

        self.failure_reason = Some(reason);
        self.status = OrderStatus::Failed;

        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), OrderError> {
        if self.status == OrderStatus::Pending {
            Ok(())
        } else {
            Err(OrderError::AlreadyCompleted {
                order_id: self.id.to_string(),
                status: self.status,
            })
        }
    }
}
