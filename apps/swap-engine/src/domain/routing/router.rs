//! Best-quote router.
//!
//! Fans a quote request out to every registered venue, bounds each venue by
//! a deadline, and reduces the settled results to the single quote with the
//! greatest output amount.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{DexError, DexRegistry, Quote, VenueId};
use crate::domain::shared::{TokenAmount, TokenMint};

/// Default per-venue quote deadline.
pub const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// How the router treats a venue whose quote call returned an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueFailurePolicy {
    /// Any venue error fails the whole routing call.
    #[default]
    FailFast,
    /// Failed venues are dropped like timed-out ones; routing fails only if
    /// every venue failed.
    SkipFailed,
}

/// Router settings.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Deadline applied to each venue's quote call.
    pub quote_timeout: Duration,
    /// Venue error handling.
    pub failure_policy: VenueFailurePolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            quote_timeout: DEFAULT_QUOTE_TIMEOUT,
            failure_policy: VenueFailurePolicy::default(),
        }
    }
}

/// Routing failures. "No quote" is not an error; it is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// A venue failed while quoting (fail-fast policy).
    #[error("venue {venue} failed to quote: {source}")]
    Venue {
        /// Venue that failed.
        venue: VenueId,
        /// Underlying venue error.
        #[source]
        source: DexError,
    },

    /// Every registered venue failed (skip-failed policy).
    #[error("no venues available: all {attempted} venues failed to quote")]
    NoVenuesAvailable {
        /// Number of venues queried.
        attempted: usize,
    },
}

/// Settled result of one venue's race against the deadline.
#[derive(Debug)]
enum VenueOutcome {
    Quoted(Vec<Quote>),
    TimedOut,
    Failed(DexError),
}

/// Deadline-bounded best-price selection across all registered venues.
#[derive(Debug, Clone)]
pub struct DexRouter {
    registry: Arc<DexRegistry>,
    config: RouterConfig,
    shutdown: CancellationToken,
}

impl DexRouter {
    /// Create a router over the given registry.
    #[must_use]
    pub fn new(registry: Arc<DexRegistry>, config: RouterConfig) -> Self {
        Self {
            registry,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Parent of every venue call's token; cancelling it stops in-flight quotes.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Token whose cancellation reaches every in-flight venue call.
    #[must_use]
    pub const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Router settings.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Venues the router fans out to.
    #[must_use]
    pub const fn registry(&self) -> &Arc<DexRegistry> {
        &self.registry
    }

    /// Find the quote with the greatest output amount.
    ///
    /// Returns `Ok(None)` when no venue produced a quote before its deadline.
    /// Ties keep the earliest quote in registry order.
    ///
    /// # Errors
    ///
    /// See [`VenueFailurePolicy`] for when venue errors surface.
    pub async fn find_best_quote(
        &self,
        token_in: &TokenMint,
        token_out: &TokenMint,
        amount: TokenAmount,
    ) -> Result<Option<Quote>, RoutingError> {
        let deadline = self.config.quote_timeout;

        let races = self.registry.dexes().iter().map(|dex| async move {
            let cancel = self.shutdown.child_token();
            let call = dex.get_quotes(token_in, token_out, amount, cancel.clone());
            let outcome = match tokio::time::timeout(deadline, call).await {
                Ok(Ok(quotes)) => VenueOutcome::Quoted(quotes),
                Ok(Err(e)) => VenueOutcome::Failed(e),
                Err(_) => {
                    cancel.cancel();
                    VenueOutcome::TimedOut
                }
            };
            (dex.id(), outcome)
        });

        let settled = join_all(races).await;
        self.select_best(settled)
    }

    fn select_best(
        &self,
        settled: Vec<(VenueId, VenueOutcome)>,
    ) -> Result<Option<Quote>, RoutingError> {
        let attempted = settled.len();
        let mut failed = 0usize;
        let mut quotes = Vec::new();

        for (venue, outcome) in settled {
            match outcome {
                VenueOutcome::Quoted(mut venue_quotes) => {
                    tracing::debug!(venue = %venue, count = venue_quotes.len(), "Venue quoted");
                    quotes.append(&mut venue_quotes);
                }
                VenueOutcome::TimedOut => {
                    tracing::warn!(
                        venue = %venue,
                        timeout_ms = self.config.quote_timeout.as_millis() as u64,
                        "Venue missed quote deadline"
                    );
                }
                VenueOutcome::Failed(source) => match self.config.failure_policy {
                    VenueFailurePolicy::FailFast => {
                        return Err(RoutingError::Venue { venue, source });
                    }
                    VenueFailurePolicy::SkipFailed => {
                        tracing::warn!(venue = %venue, error = %source, "Skipping failed venue");
                        failed += 1;
                    }
                },
            }
        }

        if attempted > 0 && failed == attempted {
            return Err(RoutingError::NoVenuesAvailable { attempted });
        }

        Ok(best_by_output(quotes))
    }
}

/// Strictly greatest output wins, so the first of equal quotes is kept.
fn best_by_output(quotes: Vec<Quote>) -> Option<Quote> {
    quotes.into_iter().fold(None, |best, quote| match best {
        Some(current) if quote.output_amount <= current.output_amount => Some(current),
        _ => Some(quote),
    })
}
