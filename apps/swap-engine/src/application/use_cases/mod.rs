//! Use Cases
//!
//! Application-specific business rules.

mod execute_order;
mod process_order_job;
mod submit_swap;

pub use execute_order::{
    ExecuteOrderError, ExecuteOrderErrorKind, ExecuteOrderRequest, ExecutionStage, OrderExecutor,
    SwapExecutionResult, SwapExecutor,
};
pub use process_order_job::{
    ExecuteOrderJobProcessor, FailureDetails, FailureSummary, JobFailure, JobSuccessSummary,
    RetryPolicy, SuccessDetails, failure_reason_for,
};
pub use submit_swap::{SubmitSwapError, SubmitSwapUseCase};
