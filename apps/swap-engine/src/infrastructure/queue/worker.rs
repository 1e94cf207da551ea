//! Worker pool.
//!
//! Pulls jobs from the in-memory queue and runs them through the handler
//! registered for their topic, bounded by a semaphore. Retryable failures
//! are re-queued after a backoff until attempts run out; backoff waits are
//! tracked with the in-flight jobs and give up on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::backoff::RetryBackoff;
use super::in_memory::{InMemoryJobQueue, QueuedJob};
use crate::application::ports::Job;
use crate::application::use_cases::{ExecuteOrderJobProcessor, JobFailure, SwapExecutor};
use crate::domain::order_execution::OrderRepository;

/// Default number of jobs processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Processes the jobs of one topic.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt; the `Ok` value becomes the job's return value.
    ///
    /// # Errors
    ///
    /// Returns the failure published on the event stream.
    async fn handle(&self, job: &dyn Job) -> Result<serde_json::Value, JobFailure>;
}

#[async_trait]
impl<X, R> JobHandler for ExecuteOrderJobProcessor<X, R>
where
    X: SwapExecutor,
    R: OrderRepository,
{
    async fn handle(&self, job: &dyn Job) -> Result<serde_json::Value, JobFailure> {
        let summary = self.process(job).await?;
        serde_json::to_value(summary).map_err(|e| JobFailure::Terminal(e.to_string()))
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Maximum jobs in flight.
    pub concurrency: usize,
    /// Delay policy between attempts.
    pub backoff: RetryBackoff,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            backoff: RetryBackoff::default(),
        }
    }
}

/// Bounded-concurrency job runner.
pub struct WorkerPool {
    queue: Arc<InMemoryJobQueue>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    config: WorkerConfig,
}

impl WorkerPool {
    /// Create a pool with no handlers.
    #[must_use]
    pub fn new(queue: Arc<InMemoryJobQueue>, config: WorkerConfig) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
            config,
        }
    }

    /// Register the handler for `topic`.
    #[must_use]
    pub fn with_handler(mut self, topic: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(topic.into(), handler);
        self
    }

    /// Run until `shutdown` is cancelled or the queue closes, then wait for
    /// in-flight jobs.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut in_flight = JoinSet::new();

        tracing::info!(concurrency = self.config.concurrency, "Worker pool started");

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
                () = shutdown.cancelled() => break,
            };
            let Ok(permit) = permit else { break };

            let job = tokio::select! {
                job = self.queue.next_job() => job,
                () = shutdown.cancelled() => break,
            };
            let Some(job) = job else { break };

            let pool = Arc::clone(&self);
            let stop = shutdown.clone();
            in_flight.spawn(async move {
                let retry = pool.process(job).await;
                drop(permit);
                if let Some((job, delay)) = retry {
                    pool.retry_after(job, delay, &stop).await;
                }
            });

            while let Some(result) = in_flight.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Job task panicked");
                }
            }
        }

        tracing::info!(in_flight = in_flight.len(), "Worker pool draining");
        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Job task panicked");
            }
        }
        tracing::info!("Worker pool stopped");
    }

    /// Run one attempt. Returns the job and its backoff when it should be retried.
    async fn process(&self, job: QueuedJob) -> Option<(QueuedJob, Duration)> {
        let Some(handler) = self.handlers.get(job.topic()) else {
            tracing::error!(job_id = %job.id(), topic = job.topic(), "No handler for topic");
            self.queue
                .report_failure(&job, format!("no handler for topic '{}'", job.topic()));
            self.queue.release(job.id());
            return None;
        };

        match handler.handle(&job).await {
            Ok(return_value) => {
                tracing::debug!(job_id = %job.id(), "Job completed");
                self.queue.complete(&job, return_value);
                None
            }
            Err(failure) => {
                tracing::error!(
                    job_id = %job.id(),
                    topic = job.topic(),
                    attempts_made = job.attempts_made(),
                    error = %failure,
                    "Job failed"
                );
                self.queue.report_failure(&job, failure.to_string());

                let attempts_left = job.attempts_made() + 1 < job.max_attempts();
                if failure.is_retryable() && attempts_left {
                    let delay = self.config.backoff.delay_for(job.attempts_made());
                    tracing::debug!(job_id = %job.id(), delay_ms = delay.as_millis() as u64, "Retrying job");
                    Some((job, delay))
                } else {
                    self.queue.release(job.id());
                    None
                }
            }
        }
    }

    /// Wait out the backoff, then hand the job back to the queue.
    async fn retry_after(&self, job: QueuedJob, delay: Duration, shutdown: &CancellationToken) {
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = shutdown.cancelled() => {
                tracing::warn!(
                    job_id = %job.id(),
                    attempts_made = job.attempts_made() + 1,
                    "Shutdown during retry backoff, job dropped"
                );
                self.queue.release(job.id());
                return;
            }
        }

        let job_id = job.id().clone();
        if !self.queue.requeue(job) {
            tracing::warn!(job_id = %job_id, "Queue closed during retry backoff, job dropped");
            self.queue.release(&job_id);
        }
    }
}
