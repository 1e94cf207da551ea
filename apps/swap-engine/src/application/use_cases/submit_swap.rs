//! Submit Swap Use Case
//!
//! Creates a pending order, persists it, and enqueues its execution job.

use std::sync::Arc;

use crate::application::dto::{OrderDto, SubmitSwapRequestDto, SubmitSwapResponseDto};
use crate::application::ports::{
    DEFAULT_JOB_ATTEMPTS, EXECUTE_ORDER_TOPIC, EnqueueOutcome, ExecuteOrderJobData, JobOptions,
    JobQueuePort, QueueError,
};
use crate::domain::order_execution::{CreateOrderCommand, Order, OrderError, OrderRepository};
use crate::domain::shared::{DomainError, JobId, OrderId, TokenAmount, TokenMint};

/// Submit swap errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmitSwapError {
    /// Request failed validation.
    #[error("{0}")]
    Validation(String),
    /// Order could not be persisted.
    #[error("failed to store order: {0}")]
    Storage(OrderError),
    /// Job could not be enqueued.
    #[error("failed to enqueue order: {0}")]
    Queue(#[from] QueueError),
}

impl From<DomainError> for SubmitSwapError {
    fn from(e: DomainError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<OrderError> for SubmitSwapError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidParameters { .. } => Self::Validation(e.to_string()),
            other => Self::Storage(other),
        }
    }
}

/// Use case for accepting swap intents.
pub struct SubmitSwapUseCase<R, Q>
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    orders: Arc<R>,
    queue: Arc<Q>,
    attempts: u32,
}

impl<R, Q> SubmitSwapUseCase<R, Q>
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    /// Create a new use case granting `attempts` tries per job.
    pub const fn new(orders: Arc<R>, queue: Arc<Q>, attempts: u32) -> Self {
        Self {
            orders,
            queue,
            attempts,
        }
    }

    /// Create with the default attempt budget.
    pub const fn with_default_attempts(orders: Arc<R>, queue: Arc<Q>) -> Self {
        Self::new(orders, queue, DEFAULT_JOB_ATTEMPTS)
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed input, otherwise storage or queue failures.
    pub async fn execute(
        &self,
        request: SubmitSwapRequestDto,
    ) -> Result<SubmitSwapResponseDto, SubmitSwapError> {
        let command = CreateOrderCommand {
            token_in: TokenMint::new(request.token_in)?,
            token_in_decimals: request.token_in_decimal,
            token_out: TokenMint::new(request.token_out)?,
            token_out_decimals: request.token_out_decimal,
            amount_in: request.amount_in.parse::<TokenAmount>()?,
        };
        let order = Order::create(command)?;

        self.orders.save(&order).await?;

        let job_id = JobId::for_order(order.id());
        let payload = serde_json::to_value(ExecuteOrderJobData::for_order(&order))
            .map_err(|e| QueueError::Payload(e.to_string()))?;
        let outcome = self
            .queue
            .enqueue(
                EXECUTE_ORDER_TOPIC,
                payload,
                JobOptions {
                    job_id: job_id.clone(),
                    attempts: self.attempts,
                },
            )
            .await?;

        if outcome == EnqueueOutcome::Duplicate {
            tracing::warn!(order_id = %order.id(), job_id = %job_id, "Execution job already queued");
        }
        tracing::info!(
            order_id = %order.id(),
            token_in = %order.token_in(),
            token_out = %order.token_out(),
            amount_in = %order.amount_in(),
            "Swap order accepted"
        );

        Ok(SubmitSwapResponseDto {
            order_id: order.id().clone(),
        })
    }

    /// Look up the persisted view of an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists.
    pub async fn find_order(&self, order_id: &OrderId) -> Result<OrderDto, OrderError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .map(|order| OrderDto::from_order(&order))
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })
    }
}
