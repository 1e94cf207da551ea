//! Job Queue Port (Driven Port)
//!
//! Contract between the engine and the queue engine: enqueueing units of
//! work, the view a worker gets of one job, and the shared event stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::order_execution::Order;
use crate::domain::shared::{JobId, OrderId, TokenAmount, TokenMint};

/// Topic for swap execution jobs.
pub const EXECUTE_ORDER_TOPIC: &str = "execute_order";

/// Attempts granted to each execute-order job.
pub const DEFAULT_JOB_ATTEMPTS: u32 = 3;

/// Payload of an execute-order job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOrderJobData {
    /// Order being executed.
    pub order_id: OrderId,
    /// Token being sold.
    pub token_in: TokenMint,
    /// Token being bought.
    pub token_out: TokenMint,
    /// Input amount, hex-encoded on the wire.
    #[serde(with = "hex_amount")]
    pub amount: TokenAmount,
}

impl ExecuteOrderJobData {
    /// Build the payload for a freshly created order.
    #[must_use]
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            token_in: order.token_in().clone(),
            token_out: order.token_out().clone(),
            amount: order.amount_in(),
        }
    }
}

mod hex_amount {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::shared::TokenAmount;

    pub(super) fn serialize<S: Serializer>(amount: &TokenAmount, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&amount.to_hex())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TokenAmount, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Options for a single enqueue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Deterministic job id; deduplicates concurrent work.
    pub job_id: JobId,
    /// Maximum attempts, including the first.
    pub attempts: u32,
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new job was queued.
    Enqueued,
    /// A job with the same id is already waiting or active.
    Duplicate,
}

/// What a worker sees of the job it is processing.
pub trait Job: Send + Sync {
    /// Job id.
    fn id(&self) -> &JobId;

    /// Raw payload as enqueued.
    fn data(&self) -> &serde_json::Value;

    /// Attempts already made before this one.
    fn attempts_made(&self) -> u32;

    /// Configured maximum attempts.
    fn max_attempts(&self) -> u32;

    /// Publish a progress payload on the event stream.
    fn update_progress(&self, payload: serde_json::Value);
}

/// Event published by the queue engine for every job transition.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// Job accepted and waiting for a worker.
    Waiting {
        /// Job id.
        job_id: JobId,
    },
    /// Worker reported progress.
    Progress {
        /// Job id.
        job_id: JobId,
        /// Progress payload.
        data: serde_json::Value,
    },
    /// Job finished successfully.
    Completed {
        /// Job id.
        job_id: JobId,
        /// Handler's return value.
        return_value: serde_json::Value,
    },
    /// An attempt failed.
    Failed {
        /// Job id.
        job_id: JobId,
        /// Failure text, sent verbatim to observers.
        failed_reason: String,
    },
}

impl QueueEvent {
    /// Job the event belongs to.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        match self {
            Self::Waiting { job_id }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. } => job_id,
        }
    }
}

/// Queue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue no longer accepts jobs.
    #[error("queue is closed")]
    Closed,
    /// Payload could not be encoded or decoded.
    #[error("job payload error: {0}")]
    Payload(String),
    /// Backend failure.
    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Queue engine operations used by the engine.
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a unit of work on a topic.
    ///
    /// # Errors
    ///
    /// Returns error if the queue rejects the job.
    async fn enqueue(
        &self,
        topic: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<EnqueueOutcome, QueueError>;

    /// Subscribe to the shared event stream.
    fn subscribe(&self) -> broadcast::Receiver<QueueEvent>;
}
