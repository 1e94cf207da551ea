//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): How the world uses our application
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems
//!
//! Order storage and venue ports live in the domain
//! ([`OrderRepository`](crate::domain::order_execution::OrderRepository),
//! [`Dex`](crate::domain::routing::Dex)).

mod job_queue_port;

pub use job_queue_port::{
    DEFAULT_JOB_ATTEMPTS, EXECUTE_ORDER_TOPIC, EnqueueOutcome, ExecuteOrderJobData, Job,
    JobOptions, JobQueuePort, QueueError, QueueEvent,
};
