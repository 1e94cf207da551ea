//! Test doubles for venue adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{ConfirmationResult, Dex, DexError, Quote, VenueId, WalletCredentials};
use crate::domain::shared::{PoolId, TokenAmount, TokenMint, TransactionHash};

/// Build a quote whose input figures are fixed and whose output is `output`.
pub(crate) fn quote(venue: VenueId, pool: &str, output: u64) -> Quote {
    Quote {
        venue_id: venue,
        pool_id: PoolId::new(pool),
        input_amount: TokenAmount::new(1_000_000),
        input_amount_with_fees: TokenAmount::new(1_002_500),
        output_amount: TokenAmount::from(output),
        min_output_amount: TokenAmount::from(output - output / 100),
    }
}

/// Scriptable in-process venue.
pub(crate) struct StubDex {
    id: VenueId,
    quotes: Result<Vec<Quote>, DexError>,
    quote_delay: Option<Duration>,
    swap_result: Result<TransactionHash, DexError>,
    confirm_result: Result<ConfirmationResult, DexError>,
    quote_cancelled: Arc<AtomicBool>,
    swaps: Arc<Mutex<Vec<PoolId>>>,
    confirmations: Arc<Mutex<Vec<(TransactionHash, String)>>>,
}

impl StubDex {
    pub(crate) fn new(id: VenueId) -> Self {
        Self {
            id,
            quotes: Ok(Vec::new()),
            quote_delay: None,
            swap_result: Ok(TransactionHash::new(format!("tx-{id}"))),
            confirm_result: Ok(ConfirmationResult {
                amount_in: TokenAmount::new(1_000_000),
                amount_out: TokenAmount::new(500_000),
            }),
            quote_cancelled: Arc::new(AtomicBool::new(false)),
            swaps: Arc::default(),
            confirmations: Arc::default(),
        }
    }

    pub(crate) fn with_quotes(mut self, quotes: Vec<Quote>) -> Self {
        self.quotes = Ok(quotes);
        self
    }

    pub(crate) fn with_quote_error(mut self, error: DexError) -> Self {
        self.quotes = Err(error);
        self
    }

    pub(crate) fn with_quote_delay(mut self, delay: Duration) -> Self {
        self.quote_delay = Some(delay);
        self
    }

    pub(crate) fn with_swap_result(mut self, result: Result<TransactionHash, DexError>) -> Self {
        self.swap_result = result;
        self
    }

    pub(crate) fn with_confirm_result(
        mut self,
        result: Result<ConfirmationResult, DexError>,
    ) -> Self {
        self.confirm_result = result;
        self
    }

    /// Set once a quote call's cancellation token fires.
    pub(crate) fn quote_cancelled_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quote_cancelled)
    }

    /// Pools passed to `swap`, in call order.
    pub(crate) fn swap_log(&self) -> Arc<Mutex<Vec<PoolId>>> {
        Arc::clone(&self.swaps)
    }

    /// `(hash, owner)` pairs passed to `confirm_transaction`.
    pub(crate) fn confirmation_log(&self) -> Arc<Mutex<Vec<(TransactionHash, String)>>> {
        Arc::clone(&self.confirmations)
    }
}

#[async_trait]
impl Dex for StubDex {
    fn id(&self) -> VenueId {
        self.id
    }

    async fn get_quotes(
        &self,
        _token_in: &TokenMint,
        _token_out: &TokenMint,
        _amount: TokenAmount,
        cancel: CancellationToken,
    ) -> Result<Vec<Quote>, DexError> {
        let flag = Arc::clone(&self.quote_cancelled);
        let watcher = cancel.clone();
        tokio::spawn(async move {
            watcher.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        if let Some(delay) = self.quote_delay {
            tokio::time::sleep(delay).await;
        }
        self.quotes.clone()
    }

    async fn swap(
        &self,
        _payer: &WalletCredentials,
        pool_id: &PoolId,
        _token_in: &TokenMint,
        _quote: &Quote,
    ) -> Result<TransactionHash, DexError> {
        self.swaps.lock().push(pool_id.clone());
        self.swap_result.clone()
    }

    async fn confirm_transaction(
        &self,
        transaction_hash: &TransactionHash,
        _token_in: &TokenMint,
        _token_out: &TokenMint,
        owner: &str,
    ) -> Result<ConfirmationResult, DexError> {
        self.confirmations
            .lock()
            .push((transaction_hash.clone(), owner.to_string()));
        self.confirm_result.clone()
    }
}
