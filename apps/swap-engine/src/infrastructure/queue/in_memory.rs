//! In-process queue engine.
//!
//! Jobs flow through an unbounded channel to the worker pool; every
//! transition is published on a broadcast channel, the shared event stream.
//! A job id stays reserved from enqueue until the job completes or gives up,
//! which is what deduplicates concurrent work per order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::application::ports::{EnqueueOutcome, Job, JobOptions, JobQueuePort, QueueError, QueueEvent};
use crate::domain::shared::JobId;

/// Default capacity of the event stream.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// One unit of work as held by the queue.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    id: JobId,
    topic: String,
    data: serde_json::Value,
    attempts_made: u32,
    max_attempts: u32,
    events: broadcast::Sender<QueueEvent>,
}

impl QueuedJob {
    /// Topic the job was enqueued on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Job for QueuedJob {
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
        let _ = self.events.send(QueueEvent::Progress {
            job_id: self.id.clone(),
            data: payload,
        });
    }
}

/// In-memory queue engine.
#[derive(Debug)]
pub struct InMemoryJobQueue {
    ready_tx: mpsc::UnboundedSender<QueuedJob>,
    ready_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<QueuedJob>>,
    reserved: Mutex<HashSet<JobId>>,
    events: broadcast::Sender<QueueEvent>,
    closed: AtomicBool,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl InMemoryJobQueue {
    /// Create a queue whose event stream buffers `event_capacity` events.
    #[must_use]
    pub fn new(event_capacity: usize) -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            ready_tx,
            ready_rx: tokio::sync::Mutex::new(ready_rx),
            reserved: Mutex::new(HashSet::new()),
            events,
            closed: AtomicBool::new(false),
        }
    }

    /// Wait for the next runnable job. `None` once the queue is closed and drained.
    pub async fn next_job(&self) -> Option<QueuedJob> {
        if self.is_closed() {
            return None;
        }
        self.ready_rx.lock().await.recv().await
    }

    /// Finish a job successfully and release its id.
    pub fn complete(&self, job: &QueuedJob, return_value: serde_json::Value) {
        self.release(&job.id);
        self.publish(QueueEvent::Completed {
            job_id: job.id.clone(),
            return_value,
        });
    }

    /// Report a failed attempt.
    pub fn report_failure(&self, job: &QueuedJob, failed_reason: String) {
        self.publish(QueueEvent::Failed {
            job_id: job.id.clone(),
            failed_reason,
        });
    }

    /// Hand `job` out again for its next attempt.
    ///
    /// Returns `false`, leaving the id reserved, when the queue is closed.
    pub fn requeue(&self, mut job: QueuedJob) -> bool {
        if self.is_closed() {
            return false;
        }
        job.attempts_made += 1;
        let job_id = job.id.clone();
        if self.ready_tx.send(job).is_err() {
            return false;
        }
        self.publish(QueueEvent::Waiting { job_id });
        true
    }

    /// Give up on a job and release its id.
    pub fn release(&self, job_id: &JobId) {
        self.reserved.lock().remove(job_id);
    }

    /// Whether `job_id` is waiting or active.
    #[must_use]
    pub fn is_reserved(&self, job_id: &JobId) -> bool {
        self.reserved.lock().contains(job_id)
    }

    /// Stop accepting and handing out jobs.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the queue was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn publish(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl JobQueuePort for InMemoryJobQueue {
    async fn enqueue(
        &self,
        topic: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<EnqueueOutcome, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        if !self.reserved.lock().insert(options.job_id.clone()) {
            tracing::debug!(job_id = %options.job_id, "Duplicate job ignored");
            return Ok(EnqueueOutcome::Duplicate);
        }

        let job = QueuedJob {
            id: options.job_id.clone(),
            topic: topic.to_string(),
            data: payload,
            attempts_made: 0,
            max_attempts: options.attempts,
            events: self.events.clone(),
        };
        if self.ready_tx.send(job).is_err() {
            self.release(&options.job_id);
            return Err(QueueError::Closed);
        }

        self.publish(QueueEvent::Waiting {
            job_id: options.job_id,
        });
        Ok(EnqueueOutcome::Enqueued)
    }

    fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }
}
