//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

pub use crate::application::dto::SubmitSwapRequestDto as ExecuteOrderRequest;

/// Query string of the progress WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressQuery {
    /// Order to observe.
    pub order_id: String,
}
