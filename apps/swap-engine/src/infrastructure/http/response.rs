//! HTTP response DTOs.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::use_cases::SubmitSwapError;
use crate::domain::order_execution::OrderError;

pub use crate::application::dto::{
    OrderDto as OrderResponse, SubmitSwapResponseDto as ExecuteOrderResponse,
};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl ApiErrorResponse {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Error wrapper mapping application errors onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    /// Request body was not a well-formed swap request.
    InvalidBody(JsonRejection),
    /// Swap intake failed.
    Submit(SubmitSwapError),
    /// Order lookup failed.
    Order(OrderError),
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::InvalidBody(e)
    }
}

impl From<SubmitSwapError> for ApiError {
    fn from(e: SubmitSwapError) -> Self {
        Self::Submit(e)
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        Self::Order(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("INVALID_REQUEST", rejection.body_text()),
            ),
            Self::Submit(SubmitSwapError::Validation(message)) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("INVALID_REQUEST", message.clone()),
            ),
            Self::Submit(SubmitSwapError::Queue(e)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorResponse::new("QUEUE_UNAVAILABLE", e.to_string()),
            ),
            Self::Submit(e @ SubmitSwapError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorResponse::new("STORAGE_ERROR", e.to_string()),
            ),
            Self::Order(e @ OrderError::NotFound { .. }) => (
                StatusCode::NOT_FOUND,
                ApiErrorResponse::new("ORDER_NOT_FOUND", e.to_string()),
            ),
            Self::Order(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorResponse::new("STORAGE_ERROR", e.to_string()),
            ),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %body.message, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}
