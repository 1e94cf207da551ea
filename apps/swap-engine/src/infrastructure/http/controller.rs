//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API and progress WebSocket that delegate to application
//! use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection, ws::WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::ports::JobQueuePort;
use crate::application::services::OrderProgressBuffer;
use crate::application::use_cases::SubmitSwapUseCase;
use crate::domain::order_execution::OrderRepository;
use crate::domain::shared::OrderId;

use super::progress_socket::handle_socket;
use super::request::{ExecuteOrderRequest, ProgressQuery};
use super::response::{ApiError, ExecuteOrderResponse, HealthResponse, OrderResponse};

/// Application state shared across handlers.
pub struct AppState<R, Q>
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    /// Use case accepting swap intents.
    pub submit_swap: Arc<SubmitSwapUseCase<R, Q>>,
    /// Replay buffer feeding progress observers.
    pub progress: Arc<OrderProgressBuffer>,
    /// Application version.
    pub version: String,
}

impl<R, Q> Clone for AppState<R, Q>
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    fn clone(&self) -> Self {
        Self {
            submit_swap: Arc::clone(&self.submit_swap),
            progress: Arc::clone(&self.progress),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<R, Q>(state: AppState<R, Q>) -> Router
where
    R: OrderRepository + 'static,
    Q: JobQueuePort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/orders/execute", post(execute_order))
        .route("/api/orders/progress", get(order_progress))
        .route("/api/orders/{order_id}", get(get_order))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<R, Q>(State(state): State<AppState<R, Q>>) -> impl IntoResponse
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Accept a swap intent and queue its execution.
async fn execute_order<R, Q>(
    State(state): State<AppState<R, Q>>,
    payload: Result<Json<ExecuteOrderRequest>, JsonRejection>,
) -> Result<Json<ExecuteOrderResponse>, ApiError>
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    let Json(request) = payload?;
    let response = state.submit_swap.execute(request).await?;
    Ok(Json(response))
}

/// Persisted view of one order.
async fn get_order<R, Q>(
    State(state): State<AppState<R, Q>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    let order = state.submit_swap.find_order(&OrderId::new(order_id)).await?;
    Ok(Json(order))
}

/// Upgrade to the progress WebSocket for one order.
async fn order_progress<R, Q>(
    State(state): State<AppState<R, Q>>,
    Query(query): Query<ProgressQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse
where
    R: OrderRepository,
    Q: JobQueuePort,
{
    let buffer = Arc::clone(&state.progress);
    let order_id = OrderId::new(query.order_id);
    ws.on_upgrade(move |socket| handle_socket(socket, buffer, order_id))
}
