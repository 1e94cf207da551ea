//! Progress WebSocket relay.
//!
//! Replays an order's buffered events, then tails live events for the same
//! order until a terminal event is delivered or the client goes away.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::application::services::{OrderProgressBuffer, ProgressEvent};
use crate::domain::shared::OrderId;

/// How a relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A completed or failed event was delivered and the socket closed.
    Terminal,
    /// The live event stream closed.
    StreamClosed,
}

/// Stream progress for `order_id` into `sink`.
///
/// # Errors
///
/// Returns the sink error if the client can no longer be written to.
pub async fn relay_progress<S>(
    buffer: &OrderProgressBuffer,
    order_id: &OrderId,
    sink: &mut S,
) -> Result<RelayOutcome, S::Error>
where
    S: Sink<Message> + Unpin,
{
    let (history, mut live) = buffer.replay_and_subscribe(order_id);

    let mut last_sequence = None;
    if deliver_unseen(sink, history, &mut last_sequence).await? {
        return Ok(RelayOutcome::Terminal);
    }

    loop {
        match live.recv().await {
            Ok(event) => {
                if &event.order_id != order_id
                    || last_sequence.is_some_and(|seen| event.sequence <= seen)
                {
                    continue;
                }
                last_sequence = Some(event.sequence);
                if deliver(sink, &event).await? {
                    return Ok(RelayOutcome::Terminal);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Skipped events may include this order's terminal one; catch up from the buffer.
                tracing::warn!(order_id = %order_id, skipped = n, "Progress relay lagged, resyncing");
                if deliver_unseen(sink, buffer.get_events(order_id), &mut last_sequence).await? {
                    return Ok(RelayOutcome::Terminal);
                }
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(RelayOutcome::StreamClosed),
        }
    }
}

/// Send buffered events newer than `last_sequence`, in order. Returns whether
/// a terminal event was delivered.
async fn deliver_unseen<S>(
    sink: &mut S,
    events: Vec<ProgressEvent>,
    last_sequence: &mut Option<u64>,
) -> Result<bool, S::Error>
where
    S: Sink<Message> + Unpin,
{
    for event in events {
        if last_sequence.is_some_and(|seen| event.sequence <= seen) {
            continue;
        }
        *last_sequence = Some(event.sequence);
        if deliver(sink, &event).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Send one event; on a terminal event also close the socket. Returns
/// whether the relay is finished.
async fn deliver<S>(sink: &mut S, event: &ProgressEvent) -> Result<bool, S::Error>
where
    S: Sink<Message> + Unpin,
{
    sink.send(Message::Text(event.to_message().into())).await?;
    if event.event_type.is_terminal() {
        sink.send(Message::Close(None)).await?;
        return Ok(true);
    }
    Ok(false)
}

/// Drive one upgraded connection.
pub(super) async fn handle_socket(socket: WebSocket, buffer: Arc<OrderProgressBuffer>, order_id: OrderId) {
    tracing::info!(order_id = %order_id, "Progress observer connected");

    let (mut sender, mut receiver) = socket.split();

    // Inbound frames are ignored; the read half only tells us the client left.
    let client_gone = async {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        result = relay_progress(&buffer, &order_id, &mut sender) => {
            match result {
                Ok(outcome) => tracing::debug!(order_id = %order_id, ?outcome, "Progress relay finished"),
                Err(e) => tracing::debug!(order_id = %order_id, error = %e, "Progress observer unreachable"),
            }
        }
        () = client_gone => {
            tracing::debug!(order_id = %order_id, "Progress observer disconnected");
        }
    }
}
