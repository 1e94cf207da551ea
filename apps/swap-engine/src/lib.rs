// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Swap Engine - Rust Core Library
//!
//! Routes token-swap intents across competing DEX venues and executes the
//! winning venue's transaction.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `order_execution`: Order entity, single-use terminal transitions
//!   - `routing`: Venue capability, venue registry, best-quote router
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Job queue contract (`JobQueuePort`, `Job`, `QueueEvent`)
//!   - `use_cases`: `SubmitSwap`, `ExecuteOrder`, `ProcessOrderJob`
//!   - `services`: Per-order progress replay buffer
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `queue`: In-process job queue and worker pool
//!   - `venues`: Simulated constant-product venues
//!   - `persistence`: Order repository (in-memory)
//!   - `http`: REST intake and progress WebSocket
//!   - `config`: Dependency injection container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Structured logging and Prometheus metrics.
pub mod observability;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{Order, OrderFailureReason, OrderRepository, OrderStatus};
pub use domain::routing::{Dex, DexError, DexRegistry, DexRouter, Quote, VenueId};
pub use domain::shared::{JobId, OrderId, Timestamp, TokenAmount, TokenMint};

// Application re-exports
pub use application::ports::{Job, JobQueuePort, QueueEvent};
pub use application::services::OrderProgressBuffer;
pub use application::use_cases::{
    ExecuteOrderJobProcessor, OrderExecutor, SubmitSwapUseCase, SwapExecutor,
};

// Infrastructure re-exports
pub use infrastructure::config::Container;
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::persistence::InMemoryOrderRepository;
pub use infrastructure::queue::{InMemoryJobQueue, WorkerPool};
pub use infrastructure::venues::SimulatedDex;
