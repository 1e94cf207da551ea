//! Process Order Job Use Case
//!
//! Bridges one queued execute-order job to the swap executor and finalizes
//! the order: confirmed on success, failed on the last allowed attempt.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::execute_order::{
    ExecuteOrderError, ExecuteOrderErrorKind, ExecuteOrderRequest, ExecutionStage,
    SwapExecutionResult, SwapExecutor,
};
use crate::application::ports::{ExecuteOrderJobData, Job};
use crate::domain::order_execution::{OrderError, OrderFailureReason, OrderRepository};
use crate::domain::routing::VenueId;
use crate::domain::shared::{OrderId, PoolId, TokenAmount, TransactionHash};

/// When a failed attempt is treated as the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Only the attempt count decides.
    #[default]
    AttemptCount,
    /// `NoPoolAvailable` ends the job immediately.
    ShortCircuitNoPool,
}

/// Details of a confirmed swap returned to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessDetails {
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
}

/// Job return value on success: `{"status":"confirmed","details":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSuccessSummary {
    /// Always `"confirmed"`.
    pub status: String,
    /// Swap details.
    pub details: SuccessDetails,
}

impl From<SwapExecutionResult> for JobSuccessSummary {
    fn from(result: SwapExecutionResult) -> Self {
        Self {
            status: "confirmed".to_string(),
            details: SuccessDetails {
                transaction_hash: result.transaction_hash,
                venue_id: result.venue_id,
                pool_id: result.pool_id,
                final_amount_in: result.amount_in,
                final_amount_out: result.amount_out,
            },
        }
    }
}

/// Classified failure as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetails {
    /// Wire reason.
    pub reason: ExecuteOrderErrorKind,
    /// Summary message.
    pub message: String,
    /// Underlying cause.
    pub details: Option<String>,
}

/// Failure text published on the event stream:
/// `{"status":"failed","details":{"reason":..,"message":..,"details":..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Always `"failed"`.
    pub status: String,
    /// Failure details.
    pub details: FailureDetails,
}

impl From<&ExecuteOrderError> for FailureSummary {
    fn from(error: &ExecuteOrderError) -> Self {
        Self {
            status: "failed".to_string(),
            details: FailureDetails {
                reason: error.kind,
                message: error.message.clone(),
                details: error.details.clone(),
            },
        }
    }
}

impl fmt::Display for FailureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Why a job attempt failed, and whether the queue may retry it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobFailure {
    /// Classified failure; the queue may run another attempt.
    #[error("{0}")]
    Retryable(FailureSummary),
    /// The queue must not retry.
    #[error("{0}")]
    Terminal(String),
}

impl JobFailure {
    /// Whether the queue may schedule another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Persisted reason for a classified executor failure.
#[must_use]
pub const fn failure_reason_for(kind: ExecuteOrderErrorKind) -> OrderFailureReason {
    match kind {
        ExecuteOrderErrorKind::NoPoolAvailable => OrderFailureReason::NoPoolsFound,
        ExecuteOrderErrorKind::SlippageExceeded => OrderFailureReason::Slippage,
        ExecuteOrderErrorKind::TransactionFailed | ExecuteOrderErrorKind::Unknown => {
            OrderFailureReason::TransactionFailed
        }
    }
}

/// Runs execute-order jobs.
///
/// Assumes the queue never runs two attempts of the same job concurrently.
pub struct ExecuteOrderJobProcessor<X, R>
where
    X: SwapExecutor,
    R: OrderRepository,
{
    executor: Arc<X>,
    orders: Arc<R>,
    retry_policy: RetryPolicy,
}

impl<X, R> ExecuteOrderJobProcessor<X, R>
where
    X: SwapExecutor,
    R: OrderRepository,
{
    /// Create a new processor.
    pub const fn new(executor: Arc<X>, orders: Arc<R>, retry_policy: RetryPolicy) -> Self {
        Self {
            executor,
            orders,
            retry_policy,
        }
    }

    /// Process one attempt of a job.
    ///
    /// # Errors
    ///
    /// Returns `JobFailure::Retryable` for classified executor failures and
    /// `JobFailure::Terminal` for everything the queue must not retry.
    pub async fn process(&self, job: &dyn Job) -> Result<JobSuccessSummary, JobFailure> {
        let data: ExecuteOrderJobData = match serde_json::from_value(job.data().clone()) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(job_id = %job.id(), error = %e, "Undecodable job payload");
                if let Some(order_id) = job.id().order_id() {
                    self.fail_terminally(&order_id).await;
                }
                return Err(JobFailure::Terminal(format!("invalid job payload: {e}")));
            }
        };

        let request = ExecuteOrderRequest {
            order_id: data.order_id.clone(),
            token_in: data.token_in,
            token_out: data.token_out,
            amount: data.amount,
        };
        let on_progress = |stage: ExecutionStage| {
            job.update_progress(serde_json::json!({ "status": stage }));
        };

        match self.executor.execute(&request, &on_progress).await {
            Ok(result) => self.confirm(&data.order_id, result).await,
            Err(error) => self.fail(job, &data.order_id, &error).await,
        }
    }

    async fn confirm(
        &self,
        order_id: &OrderId,
        result: SwapExecutionResult,
    ) -> Result<JobSuccessSummary, JobFailure> {
        match self.save_confirmation(order_id, &result).await {
            Ok(()) => {
                tracing::info!(order_id = %order_id, venue = %result.venue_id, "Order confirmed");
                Ok(result.into())
            }
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Failed to record confirmation");
                self.fail_terminally(order_id).await;
                Err(JobFailure::Terminal(e.to_string()))
            }
        }
    }

    async fn save_confirmation(
        &self,
        order_id: &OrderId,
        result: &SwapExecutionResult,
    ) -> Result<(), OrderError> {
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;

        order.mark_as_confirmed(
            result.transaction_hash.clone(),
            result.venue_id,
            result.pool_id.clone(),
            result.amount_in,
            result.amount_out,
        )?;
        self.orders.save(&order).await
    }

    async fn fail(
        &self,
        job: &dyn Job,
        order_id: &OrderId,
        error: &ExecuteOrderError,
    ) -> Result<JobSuccessSummary, JobFailure> {
        let terminal = match error.kind {
            ExecuteOrderErrorKind::Unknown => true,
            ExecuteOrderErrorKind::NoPoolAvailable => {
                self.retry_policy == RetryPolicy::ShortCircuitNoPool
            }
            ExecuteOrderErrorKind::SlippageExceeded | ExecuteOrderErrorKind::TransactionFailed => {
                false
            }
        };
        let last_attempt = terminal || is_last_attempt(job);

        tracing::warn!(
            order_id = %order_id,
            reason = %error.kind,
            attempts_made = job.attempts_made(),
            max_attempts = job.max_attempts(),
            last_attempt,
            "Order execution attempt failed"
        );

        if last_attempt {
            if let Err(e) = self.mark_failed(order_id, failure_reason_for(error.kind)).await {
                tracing::error!(order_id = %order_id, error = %e, "Failed to record order failure");
                return Err(JobFailure::Terminal(e.to_string()));
            }
        }

        let summary = FailureSummary::from(error);
        match error.kind {
            ExecuteOrderErrorKind::Unknown => Err(JobFailure::Terminal(error.message.clone())),
            _ if terminal => Err(JobFailure::Terminal(summary.to_string())),
            _ => Err(JobFailure::Retryable(summary)),
        }
    }

    /// A missing order is skipped; there is nothing to finalize.
    async fn mark_failed(
        &self,
        order_id: &OrderId,
        reason: OrderFailureReason,
    ) -> Result<(), OrderError> {
        let Some(mut order) = self.orders.find_by_id(order_id).await? else {
            tracing::warn!(order_id = %order_id, "Order not found while recording failure");
            return Ok(());
        };
        order.mark_as_failed(reason)?;
        self.orders.save(&order).await?;
        tracing::info!(order_id = %order_id, reason = %reason, "Order failed");
        Ok(())
    }

    async fn fail_terminally(&self, order_id: &OrderId) {
        if let Err(e) = self
            .mark_failed(order_id, OrderFailureReason::TransactionFailed)
            .await
        {
            tracing::warn!(order_id = %order_id, error = %e, "Could not mark order failed");
        }
    }
}

/// `attempts_made >= max_attempts - 1`, with a missing maximum read as one.
fn is_last_attempt(job: &dyn Job) -> bool {
    let max_attempts = job.max_attempts().max(1);
    job.attempts_made() >= max_attempts - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{CreateOrderCommand, Order, OrderStatus};
    use crate::domain::shared::{JobId, TokenMint};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    // Fake repository
    #[derive(Default)]
    struct FakeOrderRepository {
        orders: Mutex<HashMap<OrderId, Order>>,
        saves: AtomicUsize,
        fail_saves: bool,
    }

    #[async_trait]
    impl OrderRepository for FakeOrderRepository {
        async fn save(&self, order: &Order) -> Result<(), OrderError> {
            if self.fail_saves {
                return Err(OrderError::Storage {
                    message: "database unavailable".to_string(),
                });
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.orders.lock().insert(order.id().clone(), order.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
            Ok(self.orders.lock().get(id).cloned())
        }
    }

    // Scripted executor
    struct FakeExecutor {
        result: Result<SwapExecutionResult, ExecuteOrderError>,
    }

    #[async_trait]
    impl SwapExecutor for FakeExecutor {
        async fn execute(
            &self,
            _request: &ExecuteOrderRequest,
            on_progress: &(dyn Fn(ExecutionStage) + Send + Sync),
        ) -> Result<SwapExecutionResult, ExecuteOrderError> {
            on_progress(ExecutionStage::Routing);
            if self.result.is_ok() {
                on_progress(ExecutionStage::Building);
                on_progress(ExecutionStage::Submitted);
            }
            self.result.clone()
        }
    }

    struct FakeJob {
        id: JobId,
        data: serde_json::Value,
        attempts_made: u32,
        max_attempts: u32,
        progress: Mutex<Vec<serde_json::Value>>,
    }

    impl Job for FakeJob {
        fn id(&self) -> &JobId {
            &self.id
        }
        fn data(&self) -> &serde_json::Value {
            &self.data
        }
        fn attempts_made(&self) -> u32 {
            self.attempts_made
        }
        fn max_attempts(&self) -> u32 {
            self.max_attempts
        }
        fn update_progress(&self, payload: serde_json::Value) {
            self.progress.lock().push(payload);
        }
    }

    fn pending_order() -> Order {
        Order::create(CreateOrderCommand {
            token_in: TokenMint::new("SOL").unwrap(),
            token_in_decimals: 9,
            token_out: TokenMint::new("USDC").unwrap(),
            token_out_decimals: 6,
            amount_in: TokenAmount::new(1_000_000),
        })
        .unwrap()
    }

    fn job_for(order: &Order, attempts_made: u32) -> FakeJob {
        FakeJob {
            id: JobId::for_order(order.id()),
            data: serde_json::to_value(ExecuteOrderJobData::for_order(order)).unwrap(),
            attempts_made,
            max_attempts: 3,
            progress: Mutex::new(Vec::new()),
        }
    }

    fn success() -> Result<SwapExecutionResult, ExecuteOrderError> {
        Ok(SwapExecutionResult {
            venue_id: VenueId::Meteora,
            pool_id: PoolId::new("m1"),
            transaction_hash: TransactionHash::new("5igTx"),
            amount_in: TokenAmount::new(1_005_000),
            amount_out: TokenAmount::new(498_000),
        })
    }

    fn failure(kind: ExecuteOrderErrorKind) -> Result<SwapExecutionResult, ExecuteOrderError> {
        Err(ExecuteOrderError {
            kind,
            message: "boom".to_string(),
            details: Some("venue detail".to_string()),
        })
    }

    async fn setup(
        result: Result<SwapExecutionResult, ExecuteOrderError>,
        policy: RetryPolicy,
    ) -> (ExecuteOrderJobProcessor<FakeExecutor, FakeOrderRepository>, Arc<FakeOrderRepository>, Order) {
        let repo = Arc::new(FakeOrderRepository::default());
        let order = pending_order();
        repo.save(&order).await.unwrap();
        let processor =
            ExecuteOrderJobProcessor::new(Arc::new(FakeExecutor { result }), Arc::clone(&repo), policy);
        (processor, repo, order)
    }

    async fn stored(repo: &FakeOrderRepository, order: &Order) -> Order {
        repo.find_by_id(order.id()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn success_confirms_order_and_reports_progress() {
        let (processor, repo, order) = setup(success(), RetryPolicy::AttemptCount).await;
        let job = job_for(&order, 0);

        let summary = processor.process(&job).await.unwrap();

        assert_eq!(summary.status, "confirmed");
        assert_eq!(summary.details.final_amount_out, TokenAmount::new(498_000));

        let saved = stored(&repo, &order).await;
        assert_eq!(saved.status(), OrderStatus::Confirmed);
        let completion = saved.completion().unwrap();
        assert_eq!(completion.final_amount_in, TokenAmount::new(1_005_000));
        assert_eq!(completion.venue_id, VenueId::Meteora);

        let progress = job.progress.lock();
        assert_eq!(progress.len(), 3);
        assert_eq!(progress[0], serde_json::json!({ "status": "routing" }));
        assert_eq!(progress[2], serde_json::json!({ "status": "submitted" }));
    }

    #[test_case(0, OrderStatus::Pending ; "first attempt leaves order pending")]
    #[test_case(1, OrderStatus::Pending ; "second attempt leaves order pending")]
    #[test_case(2, OrderStatus::Failed ; "last attempt fails order")]
    #[tokio::test]
    async fn classified_failure_is_retryable_on_every_attempt(attempts_made: u32, expected: OrderStatus) {
        let (processor, repo, order) =
            setup(failure(ExecuteOrderErrorKind::SlippageExceeded), RetryPolicy::AttemptCount).await;

        let err = processor.process(&job_for(&order, attempts_made)).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(stored(&repo, &order).await.status(), expected);
    }

    #[test_case(ExecuteOrderErrorKind::NoPoolAvailable, OrderFailureReason::NoPoolsFound)]
    #[test_case(ExecuteOrderErrorKind::SlippageExceeded, OrderFailureReason::Slippage)]
    #[test_case(ExecuteOrderErrorKind::TransactionFailed, OrderFailureReason::TransactionFailed)]
    #[test_case(ExecuteOrderErrorKind::Unknown, OrderFailureReason::TransactionFailed)]
    #[tokio::test]
    async fn last_attempt_records_mapped_reason(kind: ExecuteOrderErrorKind, reason: OrderFailureReason) {
        let (processor, repo, order) = setup(failure(kind), RetryPolicy::AttemptCount).await;

        let _ = processor.process(&job_for(&order, 2)).await;

        assert_eq!(stored(&repo, &order).await.failure_reason(), Some(reason));
    }

    #[tokio::test]
    async fn failure_summary_carries_reason_message_and_details() {
        let (processor, _repo, order) =
            setup(failure(ExecuteOrderErrorKind::NoPoolAvailable), RetryPolicy::AttemptCount).await;

        let err = processor.process(&job_for(&order, 0)).await.unwrap_err();
        let json: serde_json::Value = serde_json::from_str(&err.to_string()).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["details"]["reason"], "no_pool_available");
        assert_eq!(json["details"]["message"], "boom");
        assert_eq!(json["details"]["details"], "venue detail");
    }

    #[tokio::test]
    async fn unknown_failure_is_terminal_and_final() {
        let (processor, repo, order) =
            setup(failure(ExecuteOrderErrorKind::Unknown), RetryPolicy::AttemptCount).await;

        let err = processor.process(&job_for(&order, 0)).await.unwrap_err();

        assert_eq!(err, JobFailure::Terminal("boom".to_string()));
        assert_eq!(stored(&repo, &order).await.status(), OrderStatus::Failed);
    }

    #[tokio::test]
    async fn short_circuit_policy_ends_no_pool_immediately() {
        let (processor, repo, order) =
            setup(failure(ExecuteOrderErrorKind::NoPoolAvailable), RetryPolicy::ShortCircuitNoPool).await;

        let err = processor.process(&job_for(&order, 0)).await.unwrap_err();

        assert!(!err.is_retryable());
        assert!(err.to_string().contains("no_pool_available"));
        let saved = stored(&repo, &order).await;
        assert_eq!(saved.failure_reason(), Some(OrderFailureReason::NoPoolsFound));
    }

    #[tokio::test]
    async fn short_circuit_policy_still_retries_slippage() {
        let (processor, repo, order) =
            setup(failure(ExecuteOrderErrorKind::SlippageExceeded), RetryPolicy::ShortCircuitNoPool).await;

        let err = processor.process(&job_for(&order, 0)).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(stored(&repo, &order).await.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn order_is_marked_failed_exactly_once() {
        let (processor, repo, order) =
            setup(failure(ExecuteOrderErrorKind::TransactionFailed), RetryPolicy::AttemptCount).await;

        for attempt in 0..3 {
            let _ = processor.process(&job_for(&order, attempt)).await;
        }

        // One save at setup, one when the last attempt failed the order.
        assert_eq!(repo.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_order_on_success_is_terminal() {
        let repo = Arc::new(FakeOrderRepository::default());
        let processor = ExecuteOrderJobProcessor::new(
            Arc::new(FakeExecutor { result: success() }),
            Arc::clone(&repo),
            RetryPolicy::AttemptCount,
        );

        let err = processor.process(&job_for(&pending_order(), 0)).await.unwrap_err();

        assert!(matches!(err, JobFailure::Terminal(ref m) if m.contains("not found")));
    }

    #[tokio::test]
    async fn already_completed_order_is_terminal() {
        let (processor, repo, mut order) = setup(success(), RetryPolicy::AttemptCount).await;
        order.mark_as_failed(OrderFailureReason::Slippage).unwrap();
        repo.save(&order).await.unwrap();

        let err = processor.process(&job_for(&order, 0)).await.unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(stored(&repo, &order).await.failure_reason(), Some(OrderFailureReason::Slippage));
    }

    #[tokio::test]
    async fn undecodable_payload_fails_order_terminally() {
        let (processor, repo, order) = setup(success(), RetryPolicy::AttemptCount).await;
        let mut job = job_for(&order, 0);
        job.data = serde_json::json!({ "orderId": order.id().as_str() });

        let err = processor.process(&job).await.unwrap_err();

        assert!(matches!(err, JobFailure::Terminal(ref m) if m.contains("invalid job payload")));
        let saved = stored(&repo, &order).await;
        assert_eq!(saved.failure_reason(), Some(OrderFailureReason::TransactionFailed));
    }

    #[tokio::test]
    async fn storage_failure_on_last_attempt_is_terminal() {
        let order = pending_order();
        let repo = Arc::new(FakeOrderRepository {
            fail_saves: true,
            ..FakeOrderRepository::default()
        });
        repo.orders.lock().insert(order.id().clone(), order.clone());
        let processor = ExecuteOrderJobProcessor::new(
            Arc::new(FakeExecutor {
                result: failure(ExecuteOrderErrorKind::SlippageExceeded),
            }),
            Arc::clone(&repo),
            RetryPolicy::AttemptCount,
        );

        let err = processor.process(&job_for(&order, 2)).await.unwrap_err();

        assert!(matches!(err, JobFailure::Terminal(ref m) if m.contains("database unavailable")));
    }

    #[test]
    fn zero_max_attempts_reads_as_one() {
        let order = pending_order();
        let mut job = job_for(&order, 0);
        job.max_attempts = 0;
        assert!(is_last_attempt(&job));
    }
}
