//! Swap Pipeline Integration Tests
//!
//! Drives orders from intake through the queue, the job processor, the
//! executor and the venues, then checks persisted order state and the
//! progress history an observer would replay.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use swap_engine::application::dto::SubmitSwapRequestDto;
use swap_engine::application::ports::{JobQueuePort, QueueEvent};
use swap_engine::application::services::{ProgressEvent, ProgressEventType};
use swap_engine::application::use_cases::RetryPolicy;
use swap_engine::config::{Config, VenueConfig};
use swap_engine::domain::order_execution::{Order, OrderFailureReason, OrderRepository, OrderStatus};
use swap_engine::domain::routing::{
    ConfirmationResult, Dex, DexError, Quote, VenueId, WalletCredentials,
};
use swap_engine::domain::shared::{
    OrderId, PoolId, Timestamp, TokenAmount, TokenMint, TransactionHash,
};
use swap_engine::infrastructure::config::{BackgroundTasks, Container};
use swap_engine::infrastructure::http::create_router;
use swap_engine::infrastructure::venues::SimulatedPool;

const SOL: &str = "So11111111111111111111111111111111111111112";
const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

// =============================================================================
// Scripted venue
// =============================================================================

struct ScriptedDex {
    id: VenueId,
    quotes: Vec<Quote>,
    confirmation: Result<ConfirmationResult, DexError>,
    swaps: AtomicU32,
}

impl ScriptedDex {
    fn new(id: VenueId, outputs: &[u64], confirmation: Result<ConfirmationResult, DexError>) -> Self {
        let quotes = outputs
            .iter()
            .enumerate()
            .map(|(i, &output)| Quote {
                venue_id: id,
                pool_id: PoolId::new(format!("{id}-pool-{i}")),
                input_amount: TokenAmount::from(1_000_000),
                input_amount_with_fees: TokenAmount::from(1_002_500),
                output_amount: TokenAmount::from(output),
                min_output_amount: TokenAmount::from(output * 99 / 100),
            })
            .collect();
        Self {
            id,
            quotes,
            confirmation,
            swaps: AtomicU32::new(0),
        }
    }

    fn swap_count(&self) -> u32 {
        self.swaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dex for ScriptedDex {
    fn id(&self) -> VenueId {
        self.id
    }

    async fn get_quotes(
        &self,
        _token_in: &TokenMint,
        _token_out: &TokenMint,
        _amount: TokenAmount,
        _cancel: CancellationToken,
    ) -> Result<Vec<Quote>, DexError> {
        Ok(self.quotes.clone())
    }

    async fn swap(
        &self,
        _payer: &WalletCredentials,
        pool_id: &PoolId,
        _token_in: &TokenMint,
        _quote: &Quote,
    ) -> Result<TransactionHash, DexError> {
        let n = self.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionHash::new(format!("tx-{pool_id}-{n}")))
    }

    async fn confirm_transaction(
        &self,
        _transaction_hash: &TransactionHash,
        _token_in: &TokenMint,
        _token_out: &TokenMint,
        _owner: &str,
    ) -> Result<ConfirmationResult, DexError> {
        self.confirmation.clone()
    }
}

fn confirmed(amount_in: u64, amount_out: u64) -> Result<ConfirmationResult, DexError> {
    Ok(ConfirmationResult {
        amount_in: TokenAmount::from(amount_in),
        amount_out: TokenAmount::from(amount_out),
    })
}

// =============================================================================
// Harness
// =============================================================================

fn test_config() -> Config {
    let mut config = Config::default();
    config.wallet.public_key = "TestWalletPubkey".to_string();
    config.wallet.secret_key = "test-secret".to_string();
    config.queue.initial_backoff_ms = 10;
    config.queue.max_backoff_ms = 50;
    config
}

struct Pipeline {
    container: Container,
    shutdown: CancellationToken,
    tasks: BackgroundTasks,
}

impl Pipeline {
    fn start(config: &Config, dexes: Vec<Arc<dyn Dex>>) -> Self {
        Self::from_container(Container::with_dexes(config, dexes).unwrap())
    }

    fn from_container(container: Container) -> Self {
        let shutdown = CancellationToken::new();
        let tasks = container.start(&shutdown);
        Self {
            container,
            shutdown,
            tasks,
        }
    }

    async fn submit(&self, amount_in: &str) -> OrderId {
        self.container
            .submit_swap()
            .execute(SubmitSwapRequestDto {
                token_in: SOL.to_string(),
                token_in_decimal: 9,
                token_out: USDC.to_string(),
                token_out_decimal: 6,
                amount_in: amount_in.to_string(),
            })
            .await
            .unwrap()
            .order_id
    }

    /// Poll until the order leaves `Pending`.
    async fn settled_order(&self, order_id: &OrderId) -> Order {
        for _ in 0..500 {
            let order = self
                .container
                .orders()
                .find_by_id(order_id)
                .await
                .unwrap()
                .unwrap();
            if order.status().is_terminal() {
                return order;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("order {order_id} never settled");
    }

    /// Poll until the buffer holds a terminal event that ends the job.
    async fn settled_history(&self, order_id: &OrderId, failed_attempts: usize) -> Vec<ProgressEvent> {
        for _ in 0..500 {
            let events = self.container.progress().get_events(order_id);
            let completed = events
                .iter()
                .any(|e| e.event_type == ProgressEventType::Completed);
            let failures = events
                .iter()
                .filter(|e| e.event_type == ProgressEventType::Failed)
                .count();
            if completed || failures >= failed_attempts.max(1) {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("order {order_id} history never settled");
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.container.queue().close();
        tokio::time::timeout(Duration::from_secs(5), self.tasks.join())
            .await
            .unwrap();
    }
}

fn statuses(events: &[ProgressEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.event_type == ProgressEventType::Progress)
        .map(|e| e.data["status"].as_str().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn scenario_a_routes_to_the_venue_with_the_greater_output() {
    let raydium = Arc::new(ScriptedDex::new(VenueId::Raydium, &[500_000], confirmed(1_000_000, 500_000)));
    let meteora = Arc::new(ScriptedDex::new(VenueId::Meteora, &[520_000], confirmed(1_000_000, 520_000)));
    let pipeline = Pipeline::start(
        &test_config(),
        vec![raydium.clone() as Arc<dyn Dex>, meteora.clone() as Arc<dyn Dex>],
    );

    let order_id = pipeline.submit("1000000").await;
    let order = pipeline.settled_order(&order_id).await;

    assert_eq!(order.status(), OrderStatus::Confirmed);
    let completion = order.completion().unwrap();
    assert_eq!(completion.venue_id, VenueId::Meteora);
    assert_eq!(completion.final_amount_out, TokenAmount::from(520_000));
    assert_eq!(raydium.swap_count(), 0);
    assert_eq!(meteora.swap_count(), 1);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn scenario_b_no_quotes_fails_the_order_after_the_final_attempt() {
    let raydium = Arc::new(ScriptedDex::new(VenueId::Raydium, &[], confirmed(0, 0)));
    let meteora = Arc::new(ScriptedDex::new(VenueId::Meteora, &[], confirmed(0, 0)));
    let config = test_config();
    let pipeline = Pipeline::start(&config, vec![raydium as Arc<dyn Dex>, meteora as Arc<dyn Dex>]);

    let order_id = pipeline.submit("1000000").await;
    let order = pipeline.settled_order(&order_id).await;

    assert_eq!(order.status(), OrderStatus::Failed);
    assert_eq!(order.failure_reason(), Some(OrderFailureReason::NoPoolsFound));
    assert!(order.completion().is_none());

    let attempts = config.queue.attempts as usize;
    let history = pipeline.settled_history(&order_id, attempts).await;
    let failures: Vec<&ProgressEvent> = history
        .iter()
        .filter(|e| e.event_type == ProgressEventType::Failed)
        .collect();
    assert_eq!(failures.len(), attempts);

    let last: serde_json::Value = serde_json::from_str(&failures[attempts - 1].to_message()).unwrap();
    assert_eq!(last["status"], "failed");
    assert_eq!(last["details"]["reason"], "no_pool_available");

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn scenario_c_confirmation_records_realized_amounts() {
    let started = Timestamp::now();
    let raydium = Arc::new(ScriptedDex::new(VenueId::Raydium, &[500_000], confirmed(1_005_000, 498_000)));
    let pipeline = Pipeline::start(&test_config(), vec![raydium as Arc<dyn Dex>]);

    let order_id = pipeline.submit("1000000").await;
    let order = pipeline.settled_order(&order_id).await;

    assert_eq!(order.status(), OrderStatus::Confirmed);
    assert_eq!(order.amount_in(), TokenAmount::from(1_000_000));
    let completion = order.completion().unwrap();
    assert_eq!(completion.final_amount_in, TokenAmount::from(1_005_000));
    assert_eq!(completion.final_amount_out, TokenAmount::from(498_000));
    assert!(completion.confirmed_at >= started);

    let history = pipeline.settled_history(&order_id, 0).await;
    assert_eq!(history[0].event_type, ProgressEventType::Waiting);
    assert_eq!(statuses(&history), vec!["routing", "building", "submitted"]);

    let completed = history.last().unwrap();
    assert_eq!(completed.event_type, ProgressEventType::Completed);
    assert_eq!(completed.data["status"], "confirmed");
    assert_eq!(completed.data["details"]["venueId"], "raydium");
    assert_eq!(completed.data["details"]["finalAmountIn"], "1005000");
    assert_eq!(completed.data["details"]["finalAmountOut"], "498000");

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn scenario_d_slippage_fails_the_order_after_the_final_attempt() {
    let raydium = Arc::new(ScriptedDex::new(
        VenueId::Raydium,
        &[500_000],
        Err(DexError::SlippageExceeded {
            message: "realized 480000 below minimum 495000".to_string(),
        }),
    ));
    let config = test_config();
    let pipeline = Pipeline::start(&config, vec![raydium.clone() as Arc<dyn Dex>]);

    let order_id = pipeline.submit("1000000").await;
    let order = pipeline.settled_order(&order_id).await;

    assert_eq!(order.status(), OrderStatus::Failed);
    assert_eq!(order.failure_reason(), Some(OrderFailureReason::Slippage));
    assert_eq!(raydium.swap_count(), config.queue.attempts);

    pipeline.stop().await;
}

// =============================================================================
// Policies and wiring
// =============================================================================

#[tokio::test(start_paused = true)]
async fn short_circuit_policy_fails_no_pool_orders_on_the_first_attempt() {
    let raydium = Arc::new(ScriptedDex::new(VenueId::Raydium, &[], confirmed(0, 0)));
    let mut config = test_config();
    config.queue.retry_policy = RetryPolicy::ShortCircuitNoPool;
    let pipeline = Pipeline::start(&config, vec![raydium as Arc<dyn Dex>]);
    let mut events = pipeline.container.queue().subscribe();

    let order_id = pipeline.submit("1000000").await;
    let order = pipeline.settled_order(&order_id).await;
    assert_eq!(order.failure_reason(), Some(OrderFailureReason::NoPoolsFound));

    // Let any scheduled retry fire before counting.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, QueueEvent::Failed { .. }) {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);

    pipeline.stop().await;
}

#[tokio::test(start_paused = true)]
async fn http_intake_executes_against_simulated_pools() {
    let mut config = test_config();
    config.venues = vec![
        VenueConfig {
            id: VenueId::Raydium,
            quote_latency_ms: 5,
            slippage_tolerance: Decimal::new(1, 2),
            realized_output_factor: Decimal::ONE,
            pools: vec![SimulatedPool {
                pool_id: PoolId::new("raydium-sol-usdc"),
                token_a: TokenMint::new(SOL).unwrap(),
                token_b: TokenMint::new(USDC).unwrap(),
                reserve_a: 1_000_000_000_000,
                reserve_b: 150_000_000_000,
                fee_bps: 25,
            }],
        },
        VenueConfig {
            id: VenueId::Meteora,
            quote_latency_ms: 5,
            slippage_tolerance: Decimal::new(1, 2),
            realized_output_factor: Decimal::ONE,
            pools: vec![SimulatedPool {
                pool_id: PoolId::new("meteora-sol-usdc"),
                token_a: TokenMint::new(SOL).unwrap(),
                token_b: TokenMint::new(USDC).unwrap(),
                reserve_a: 1_000_000_000_000,
                reserve_b: 151_000_000_000,
                fee_bps: 30,
            }],
        },
    ];
    let pipeline = Pipeline::from_container(Container::from_config(&config).unwrap());
    let app = create_router(pipeline.container.app_state("test"));

    let body = serde_json::json!({
        "tokenIn": SOL,
        "tokenInDecimal": 9,
        "tokenOut": USDC,
        "tokenOutDecimal": 6,
        "amountIn": "1000000000"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders/execute")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let order_id = OrderId::new(created["orderId"].as_str().unwrap());

    let order = pipeline.settled_order(&order_id).await;
    assert_eq!(order.status(), OrderStatus::Confirmed);
    let completion = order.completion().unwrap();
    assert_eq!(completion.venue_id, VenueId::Meteora);
    assert_eq!(completion.pool_id, PoolId::new("meteora-sol-usdc"));

    pipeline.stop().await;
}
