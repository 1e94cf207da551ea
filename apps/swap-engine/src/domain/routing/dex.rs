//! Dex capability (Driven Port)
//!
//! Interface every venue adapter implements. All operations are fallible
//! network calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{Quote, VenueId, WalletCredentials};
use crate::domain::shared::{PoolId, TokenAmount, TokenMint, TransactionHash};

/// Errors raised by venue adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DexError {
    /// Realized price moved beyond the quote's tolerance.
    #[error("Slippage exceeded: {message}")]
    SlippageExceeded {
        /// Venue-provided detail.
        message: String,
    },

    /// Transport or RPC failure.
    #[error("Venue network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// Transaction was rejected or failed on-chain.
    #[error("Transaction failed: {message}")]
    TransactionFailed {
        /// Error message.
        message: String,
    },

    /// The call was abandoned because the caller cancelled it.
    #[error("Venue call cancelled")]
    Cancelled,
}

impl DexError {
    /// Whether this is the venue's slippage signal.
    #[must_use]
    pub const fn is_slippage(&self) -> bool {
        matches!(self, Self::SlippageExceeded { .. })
    }
}

/// Realized balance deltas of a confirmed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    /// Amount of the input token that left the wallet.
    pub amount_in: TokenAmount,
    /// Amount of the output token that arrived.
    pub amount_out: TokenAmount,
}

/// An exchange venue able to quote and execute swaps.
#[async_trait]
pub trait Dex: Send + Sync {
    /// Venue identifier.
    fn id(&self) -> VenueId;

    /// Quote every pool for the pair.
    ///
    /// `cancel` fires when the router stops waiting; adapters that spawn
    /// background work should stop it when the token is cancelled.
    async fn get_quotes(
        &self,
        token_in: &TokenMint,
        token_out: &TokenMint,
        amount: TokenAmount,
        cancel: CancellationToken,
    ) -> Result<Vec<Quote>, DexError>;

    /// Build, sign and submit the swap transaction.
    async fn swap(
        &self,
        payer: &WalletCredentials,
        pool_id: &PoolId,
        token_in: &TokenMint,
        quote: &Quote,
    ) -> Result<TransactionHash, DexError>;

    /// Wait for finality and compute realized deltas for `owner`.
    async fn confirm_transaction(
        &self,
        transaction_hash: &TransactionHash,
        token_in: &TokenMint,
        token_out: &TokenMint,
        owner: &str,
    ) -> Result<ConfirmationResult, DexError>;
}
