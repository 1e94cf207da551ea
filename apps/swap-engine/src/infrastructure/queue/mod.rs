//! Queue Engine Adapter
//!
//! In-process implementation of the job queue contract plus the worker pool
//! that drives jobs through their handlers.

mod backoff;
mod in_memory;
mod worker;

pub use backoff::RetryBackoff;
pub use in_memory::{DEFAULT_EVENT_CAPACITY, InMemoryJobQueue, QueuedJob};
pub use worker::{DEFAULT_CONCURRENCY, JobHandler, WorkerConfig, WorkerPool};
