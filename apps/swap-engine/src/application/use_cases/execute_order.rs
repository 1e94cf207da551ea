//! Execute Order Use Case
//!
//! Drives one order through route -> build -> submit -> confirm and
//! normalizes every failure into [`ExecuteOrderErrorKind`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::routing::{DexError, DexRouter, Quote, RoutingError, VenueId, WalletCredentials};
use crate::domain::shared::{OrderId, PoolId, TokenAmount, TokenMint, TransactionHash};
use crate::observability::{record_execution_result, record_routing_outcome};

/// Pipeline stage reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStage {
    /// Looking for the best quote.
    Routing,
    /// Building and signing the swap.
    Building,
    /// Transaction sent, awaiting confirmation.
    Submitted,
}

impl ExecutionStage {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::Building => "building",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swap to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOrderRequest {
    /// Order being executed, for log correlation.
    pub order_id: OrderId,
    /// Token being sold.
    pub token_in: TokenMint,
    /// Token being bought.
    pub token_out: TokenMint,
    /// Input amount in base units.
    pub amount: TokenAmount,
}

/// Realized outcome of a confirmed swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapExecutionResult {
    /// Venue that executed the swap.
    pub venue_id: VenueId,
    /// Pool the swap went through.
    pub pool_id: PoolId,
    /// Transaction signature.
    pub transaction_hash: TransactionHash,
    /// Realized input delta.
    pub amount_in: TokenAmount,
    /// Realized output delta.
    pub amount_out: TokenAmount,
}

/// Closed failure taxonomy of the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteOrderErrorKind {
    /// No venue produced a usable quote.
    #[serde(rename = "no_pool_available")]
    NoPoolAvailable,
    /// Realized price moved beyond tolerance.
    #[serde(rename = "slippage")]
    SlippageExceeded,
    /// Any other on-chain or network failure.
    TransactionFailed,
    /// Catch-all for failures outside the taxonomy.
    Unknown,
}

impl ExecuteOrderErrorKind {
    /// Wire reason reported to observers.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NoPoolAvailable => "no_pool_available",
            Self::SlippageExceeded => "slippage",
            Self::TransactionFailed => "transaction_failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecuteOrderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Classified executor failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExecuteOrderError {
    /// Classification.
    pub kind: ExecuteOrderErrorKind,
    /// Human-readable summary.
    pub message: String,
    /// Underlying cause, if any.
    pub details: Option<String>,
}

impl ExecuteOrderError {
    fn new(kind: ExecuteOrderErrorKind, message: &str, details: Option<String>) -> Self {
        Self {
            kind,
            message: message.to_string(),
            details,
        }
    }

    fn no_pool(details: Option<String>) -> Self {
        Self::new(
            ExecuteOrderErrorKind::NoPoolAvailable,
            "Could not find a pool meeting requirements",
            details,
        )
    }

    /// Slippage from any stage is reclassified; everything else a venue
    /// raises is a transaction failure.
    fn from_dex(error: &DexError, stage: &str) -> Self {
        if error.is_slippage() {
            Self::new(
                ExecuteOrderErrorKind::SlippageExceeded,
                "Slippage exceeded",
                Some(error.to_string()),
            )
        } else {
            Self::new(
                ExecuteOrderErrorKind::TransactionFailed,
                &format!("Swap failed during {stage}"),
                Some(error.to_string()),
            )
        }
    }

    fn from_routing(error: &RoutingError) -> Self {
        match error {
            RoutingError::NoVenuesAvailable { .. } => Self::no_pool(Some(error.to_string())),
            RoutingError::Venue { .. } => Self::new(
                ExecuteOrderErrorKind::TransactionFailed,
                "Routing failed",
                Some(error.to_string()),
            ),
        }
    }
}

/// Swap pipeline as seen by the job processor.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    /// Execute one swap, reporting each stage through `on_progress`.
    ///
    /// # Errors
    ///
    /// Every failure is an [`ExecuteOrderError`] with a classified kind.
    async fn execute(
        &self,
        request: &ExecuteOrderRequest,
        on_progress: &(dyn Fn(ExecutionStage) + Send + Sync),
    ) -> Result<SwapExecutionResult, ExecuteOrderError>;
}

/// Route, build, submit and confirm a swap against the registered venues.
#[derive(Debug, Clone)]
pub struct OrderExecutor {
    router: Arc<DexRouter>,
    wallet: WalletCredentials,
}

impl OrderExecutor {
    /// Create a new executor paying from `wallet`.
    #[must_use]
    pub const fn new(router: Arc<DexRouter>, wallet: WalletCredentials) -> Self {
        Self { router, wallet }
    }

    async fn route(&self, request: &ExecuteOrderRequest) -> Result<Quote, ExecuteOrderError> {
        tracing::info!(order_id = %request.order_id, "Routing to the best possible pool");

        let started = Instant::now();
        let routed = self
            .router
            .find_best_quote(&request.token_in, &request.token_out, request.amount)
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        match routed {
            Ok(Some(quote)) => {
                record_routing_outcome("quoted", elapsed);
                tracing::info!(
                    order_id = %request.order_id,
                    venue = %quote.venue_id,
                    pool_id = %quote.pool_id,
                    input_amount = %quote.input_amount,
                    output_amount = %quote.output_amount,
                    min_output_amount = %quote.min_output_amount,
                    "Routed to the best pool"
                );
                Ok(quote)
            }
            Ok(None) => {
                record_routing_outcome("no_quote", elapsed);
                let error = ExecuteOrderError::no_pool(None);
                tracing::error!(order_id = %request.order_id, "{}", error.message);
                Err(error)
            }
            Err(e) => {
                record_routing_outcome("error", elapsed);
                tracing::error!(order_id = %request.order_id, error = %e, "Routing failed");
                Err(ExecuteOrderError::from_routing(&e))
            }
        }
    }

    async fn run(
        &self,
        request: &ExecuteOrderRequest,
        on_progress: &(dyn Fn(ExecutionStage) + Send + Sync),
    ) -> Result<SwapExecutionResult, ExecuteOrderError> {
        on_progress(ExecutionStage::Routing);
        let quote = self.route(request).await?;

        let dex = self.router.registry().with_id(quote.venue_id).ok_or_else(|| {
            ExecuteOrderError::new(
                ExecuteOrderErrorKind::Unknown,
                "Unknown error",
                Some(format!("venue {} is not registered", quote.venue_id)),
            )
        })?;

        on_progress(ExecutionStage::Building);
        tracing::info!(
            order_id = %request.order_id,
            venue = %quote.venue_id,
            pool_id = %quote.pool_id,
            "Building swap transaction"
        );

        let transaction_hash = dex
            .swap(&self.wallet, &quote.pool_id, &request.token_in, &quote)
            .await
            .map_err(|e| {
                tracing::error!(order_id = %request.order_id, error = %e, "Failed to send swap transaction");
                ExecuteOrderError::from_dex(&e, "submission")
            })?;

        on_progress(ExecutionStage::Submitted);
        tracing::info!(
            order_id = %request.order_id,
            venue = %quote.venue_id,
            pool_id = %quote.pool_id,
            transaction_hash = %transaction_hash,
            amount_in = %quote.input_amount,
            "Transaction submitted"
        );

        let confirmation = dex
            .confirm_transaction(
                &transaction_hash,
                &request.token_in,
                &request.token_out,
                self.wallet.public_key(),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    order_id = %request.order_id,
                    transaction_hash = %transaction_hash,
                    error = %e,
                    "Transaction failed"
                );
                ExecuteOrderError::from_dex(&e, "confirmation")
            })?;

        tracing::info!(
            order_id = %request.order_id,
            transaction_hash = %transaction_hash,
            amount_in = %confirmation.amount_in,
            amount_out = %confirmation.amount_out,
            "Swap transaction confirmed"
        );

        Ok(SwapExecutionResult {
            venue_id: quote.venue_id,
            pool_id: quote.pool_id,
            transaction_hash,
            amount_in: confirmation.amount_in,
            amount_out: confirmation.amount_out,
        })
    }
}

#[async_trait]
impl SwapExecutor for OrderExecutor {
    async fn execute(
        &self,
        request: &ExecuteOrderRequest,
        on_progress: &(dyn Fn(ExecutionStage) + Send + Sync),
    ) -> Result<SwapExecutionResult, ExecuteOrderError> {
        let result = self.run(request, on_progress).await;
        match &result {
            Ok(done) => record_execution_result("confirmed", done.venue_id.as_str()),
            Err(e) => record_execution_result(e.kind.reason(), "none"),
        }
        result
    }
}
