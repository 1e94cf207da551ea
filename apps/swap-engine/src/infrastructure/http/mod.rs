//! HTTP/REST API adapter.
//!
//! Inbound adapter implementing the swap intake endpoints and the progress
//! WebSocket relay.

mod controller;
mod progress_socket;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use progress_socket::{RelayOutcome, relay_progress};
pub use request::*;
pub use response::*;
