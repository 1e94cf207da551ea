//! Simulated venue.
//!
//! Quotes against configured constant-product pools and "executes" swaps
//! in memory. Used for local runs and end-to-end tests where no chain is
//! available.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::routing::{
    ConfirmationResult, Dex, DexError, Quote, VenueId, WalletCredentials,
};
use crate::domain::shared::{PoolId, TokenAmount, TokenMint, TransactionHash};

const BPS_DENOMINATOR: u128 = 10_000;

/// One constant-product pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedPool {
    /// Pool address.
    pub pool_id: PoolId,
    /// First token of the pair.
    pub token_a: TokenMint,
    /// Second token of the pair.
    pub token_b: TokenMint,
    /// Reserve of `token_a` in base units.
    pub reserve_a: u64,
    /// Reserve of `token_b` in base units.
    pub reserve_b: u64,
    /// Swap fee in basis points.
    pub fee_bps: u32,
}

impl SimulatedPool {
    /// Reserves oriented for a swap from `token_in`, if the pool trades the pair.
    fn reserves_for(&self, token_in: &TokenMint, token_out: &TokenMint) -> Option<(u128, u128)> {
        let (a, b) = (u128::from(self.reserve_a), u128::from(self.reserve_b));
        if &self.token_a == token_in && &self.token_b == token_out {
            Some((a, b))
        } else if &self.token_b == token_in && &self.token_a == token_out {
            Some((b, a))
        } else {
            None
        }
    }
}

/// Behaviour of a simulated venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedDexConfig {
    /// Pools the venue quotes.
    #[serde(default)]
    pub pools: Vec<SimulatedPool>,
    /// Artificial latency of each quote call.
    #[serde(default)]
    pub quote_latency: Duration,
    /// Fraction of the output the minimum may fall short by.
    pub slippage_tolerance: Decimal,
    /// Realized output as a fraction of the quoted output.
    pub realized_output_factor: Decimal,
}

impl Default for SimulatedDexConfig {
    fn default() -> Self {
        Self {
            pools: Vec::new(),
            quote_latency: Duration::ZERO,
            slippage_tolerance: Decimal::new(1, 2),
            realized_output_factor: Decimal::ONE,
        }
    }
}

/// In-memory venue adapter.
#[derive(Debug)]
pub struct SimulatedDex {
    id: VenueId,
    config: SimulatedDexConfig,
    executed: Mutex<HashMap<TransactionHash, (String, Quote)>>,
}

impl SimulatedDex {
    /// Create a simulated venue.
    #[must_use]
    pub fn new(id: VenueId, config: SimulatedDexConfig) -> Self {
        Self {
            id,
            config,
            executed: Mutex::new(HashMap::new()),
        }
    }

    fn quote_pool(&self, pool: &SimulatedPool, reserve_in: u128, reserve_out: u128, amount: u128) -> Option<Quote> {
        let fee = amount.checked_mul(u128::from(pool.fee_bps))? / BPS_DENOMINATOR;
        // A fee above 100% leaves nothing to swap; such a pool never quotes.
        let amount_after_fee = amount.checked_sub(fee)?;
        let output = reserve_out.checked_mul(amount_after_fee)? / reserve_in.checked_add(amount_after_fee)?;
        if output == 0 {
            return None;
        }
        let min_output = scale(output, Decimal::ONE - self.config.slippage_tolerance)?;

        Some(Quote {
            venue_id: self.id,
            pool_id: pool.pool_id.clone(),
            input_amount: TokenAmount::new(amount_after_fee),
            input_amount_with_fees: TokenAmount::new(amount),
            output_amount: TokenAmount::new(output),
            min_output_amount: TokenAmount::new(min_output),
        })
    }
}

/// `amount * factor`, rounded down.
fn scale(amount: u128, factor: Decimal) -> Option<u128> {
    let scaled = Decimal::from_u128(amount)?.checked_mul(factor)?;
    scaled.floor().to_u128()
}

#[async_trait]
impl Dex for SimulatedDex {
    fn id(&self) -> VenueId {
        self.id
    }

    async fn get_quotes(
        &self,
        token_in: &TokenMint,
        token_out: &TokenMint,
        amount: TokenAmount,
        cancel: CancellationToken,
    ) -> Result<Vec<Quote>, DexError> {
        if !self.config.quote_latency.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(self.config.quote_latency) => {}
                () = cancel.cancelled() => return Err(DexError::Cancelled),
            }
        }

        let quotes = self
            .config
            .pools
            .iter()
            .filter_map(|pool| {
                let (reserve_in, reserve_out) = pool.reserves_for(token_in, token_out)?;
                self.quote_pool(pool, reserve_in, reserve_out, amount.base_units())
            })
            .collect();
        Ok(quotes)
    }

    async fn swap(
        &self,
        payer: &WalletCredentials,
        pool_id: &PoolId,
        _token_in: &TokenMint,
        quote: &Quote,
    ) -> Result<TransactionHash, DexError> {
        if !self.config.pools.iter().any(|p| &p.pool_id == pool_id) {
            return Err(DexError::TransactionFailed {
                message: format!("pool {pool_id} does not exist"),
            });
        }

        let hash = TransactionHash::new(format!("sim{}", uuid::Uuid::new_v4().simple()));
        self.executed
            .lock()
            .insert(hash.clone(), (payer.public_key().to_string(), quote.clone()));
        tracing::debug!(venue = %self.id, pool_id = %pool_id, transaction_hash = %hash, "Simulated swap sent");
        Ok(hash)
    }

    async fn confirm_transaction(
        &self,
        transaction_hash: &TransactionHash,
        _token_in: &TokenMint,
        _token_out: &TokenMint,
        owner: &str,
    ) -> Result<ConfirmationResult, DexError> {
        let (payer, quote) = self
            .executed
            .lock()
            .get(transaction_hash)
            .cloned()
            .ok_or_else(|| DexError::TransactionFailed {
                message: format!("transaction {transaction_hash} not found"),
            })?;
        if payer != owner {
            return Err(DexError::TransactionFailed {
                message: format!("transaction {transaction_hash} was not signed by {owner}"),
            });
        }

        let realized = scale(quote.output_amount.base_units(), self.config.realized_output_factor)
            .ok_or_else(|| DexError::TransactionFailed {
                message: "realized output out of range".to_string(),
            })?;
        if realized < quote.min_output_amount.base_units() {
            return Err(DexError::SlippageExceeded {
                message: format!(
                    "realized output {realized} below minimum {}",
                    quote.min_output_amount
                ),
            });
        }

        Ok(ConfirmationResult {
            amount_in: quote.input_amount_with_fees,
            amount_out: TokenAmount::new(realized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mint(s: &str) -> TokenMint {
        TokenMint::new(s).unwrap()
    }

    fn pool(id: &str, reserve_a: u64, reserve_b: u64) -> SimulatedPool {
        SimulatedPool {
            pool_id: PoolId::new(id),
            token_a: mint("SOL"),
            token_b: mint("USDC"),
            reserve_a,
            reserve_b,
            fee_bps: 25,
        }
    }

    fn dex(factor: Decimal) -> SimulatedDex {
        SimulatedDex::new(
            VenueId::Raydium,
            SimulatedDexConfig {
                pools: vec![pool("p1", 1_000_000_000, 500_000_000), pool("p2", 10, 10)],
                realized_output_factor: factor,
                ..SimulatedDexConfig::default()
            },
        )
    }

    async fn quotes(dex: &SimulatedDex, from: &str, to: &str) -> Vec<Quote> {
        dex.get_quotes(&mint(from), &mint(to), TokenAmount::new(1_000_000), CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn quotes_constant_product_with_fee() {
        let dex = dex(Decimal::ONE);
        let quotes = quotes(&dex, "SOL", "USDC").await;

        let q = quotes.iter().find(|q| q.pool_id.as_str() == "p1").unwrap();
        assert_eq!(q.input_amount_with_fees, TokenAmount::new(1_000_000));
        assert_eq!(q.input_amount, TokenAmount::new(997_500));
        // 500_000_000 * 997_500 / (1_000_000_000 + 997_500)
        assert_eq!(q.output_amount, TokenAmount::new(498_252));
        assert_eq!(q.min_output_amount, TokenAmount::new(493_269));
    }

    #[tokio::test]
    async fn quotes_reverse_direction_and_skips_other_pairs() {
        let dex = dex(Decimal::ONE);
        assert!(!quotes(&dex, "USDC", "SOL").await.is_empty());
        assert!(quotes(&dex, "SOL", "BONK").await.is_empty());
    }

    #[tokio::test]
    async fn swap_then_confirm_returns_realized_deltas() {
        let dex = dex(dec!(0.995));
        let wallet = WalletCredentials::new("payer", "secret");
        let quote = quotes(&dex, "SOL", "USDC").await.remove(0);

        let hash = dex.swap(&wallet, &quote.pool_id, &mint("SOL"), &quote).await.unwrap();
        let result = dex
            .confirm_transaction(&hash, &mint("SOL"), &mint("USDC"), "payer")
            .await
            .unwrap();

        assert_eq!(result.amount_in, TokenAmount::new(1_000_000));
        assert_eq!(result.amount_out, TokenAmount::new(495_760));
    }

    #[tokio::test]
    async fn realized_output_below_minimum_is_slippage() {
        let dex = dex(dec!(0.9));
        let wallet = WalletCredentials::new("payer", "secret");
        let quote = quotes(&dex, "SOL", "USDC").await.remove(0);

        let hash = dex.swap(&wallet, &quote.pool_id, &mint("SOL"), &quote).await.unwrap();
        let err = dex
            .confirm_transaction(&hash, &mint("SOL"), &mint("USDC"), "payer")
            .await
            .unwrap_err();

        assert!(err.is_slippage());
    }

    #[tokio::test]
    async fn pool_with_fee_above_whole_amount_is_skipped() {
        let mut broken = pool("p3", 1_000_000_000, 500_000_000);
        broken.fee_bps = 20_000;
        let dex = SimulatedDex::new(
            VenueId::Raydium,
            SimulatedDexConfig {
                pools: vec![broken, pool("p1", 1_000_000_000, 500_000_000)],
                ..SimulatedDexConfig::default()
            },
        );

        let quotes = quotes(&dex, "SOL", "USDC").await;

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].pool_id.as_str(), "p1");
    }

    #[tokio::test]
    async fn unknown_transaction_fails() {
        let dex = dex(Decimal::ONE);
        let err = dex
            .confirm_transaction(&TransactionHash::new("nope"), &mint("SOL"), &mint("USDC"), "payer")
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::TransactionFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_quote_observes_cancellation() {
        let dex = SimulatedDex::new(
            VenueId::Meteora,
            SimulatedDexConfig {
                quote_latency: Duration::from_secs(30),
                ..SimulatedDexConfig::default()
            },
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = dex
            .get_quotes(&mint("SOL"), &mint("USDC"), TokenAmount::new(1), cancel)
            .await
            .unwrap_err();
        assert_eq!(err, DexError::Cancelled);
    }
}
