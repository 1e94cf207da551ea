//! Order Progress Buffer
//!
//! Keeps a bounded, TTL'd history of queue events per order so an observer
//! that connects late can replay what it missed before tailing live events.
//!
//! One background task demultiplexes the shared queue event stream into
//! per-order queues and periodically sweeps expired events.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::QueueEvent;
use crate::domain::shared::{OrderId, Timestamp};
use crate::observability::update_buffered_orders;

/// Capacity of the live fan-out channel to relays.
const LIVE_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for the progress buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBufferConfig {
    /// Events kept per order; the oldest is evicted on overflow.
    pub max_events_per_order: usize,
    /// Age after which an event is dropped by the sweep.
    pub max_age: Duration,
    /// Period of the expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for ProgressBufferConfig {
    fn default() -> Self {
        Self {
            max_events_per_order: 100,
            max_age: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Kind of buffered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressEventType {
    /// Job queued.
    Waiting,
    /// Pipeline stage reported.
    Progress,
    /// Job finished successfully.
    Completed,
    /// An attempt failed.
    Failed,
}

impl ProgressEventType {
    /// Whether observers should stop listening after this event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One buffered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Buffer-wide insertion sequence, used to dedupe replay and live tail.
    pub sequence: u64,
    /// Owning order.
    pub order_id: OrderId,
    /// Event kind.
    #[serde(rename = "type")]
    pub event_type: ProgressEventType,
    /// When the buffer received the event.
    pub timestamp: Timestamp,
    /// Payload; failure reasons are kept as a JSON string.
    pub data: serde_json::Value,
}

impl ProgressEvent {
    /// Text sent to an observer: failure reasons verbatim, everything else as JSON.
    #[must_use]
    pub fn to_message(&self) -> String {
        match (&self.event_type, &self.data) {
            (ProgressEventType::Failed, serde_json::Value::String(reason)) => reason.clone(),
            (_, data) => data.to_string(),
        }
    }
}

/// Map a queue event to its order, kind and payload. `None` for jobs that
/// do not follow the execute-order naming convention.
fn demultiplex(event: &QueueEvent) -> Option<(OrderId, ProgressEventType, serde_json::Value)> {
    let order_id = event.job_id().order_id()?;
    let (event_type, data) = match event {
        QueueEvent::Waiting { .. } => (
            ProgressEventType::Waiting,
            serde_json::json!({ "status": "pending" }),
        ),
        QueueEvent::Progress { data, .. } => (ProgressEventType::Progress, data.clone()),
        QueueEvent::Completed { return_value, .. } => {
            (ProgressEventType::Completed, return_value.clone())
        }
        QueueEvent::Failed { failed_reason, .. } => (
            ProgressEventType::Failed,
            serde_json::Value::String(failed_reason.clone()),
        ),
    };
    Some((order_id, event_type, data))
}

/// Wall-clock time advanced by the tokio clock, so a paused runtime also
/// pauses event ageing.
#[derive(Debug, Clone, Copy)]
struct RuntimeClock {
    origin: Timestamp,
    started: Instant,
}

impl RuntimeClock {
    fn start() -> Self {
        Self {
            origin: Timestamp::now(),
            started: Instant::now(),
        }
    }

    fn now(&self) -> Timestamp {
        self.origin.plus(self.started.elapsed())
    }
}

#[derive(Debug, Default)]
struct BufferState {
    next_sequence: u64,
    orders: HashMap<OrderId, VecDeque<ProgressEvent>>,
}

/// Per-order replay buffer.
#[derive(Debug)]
pub struct OrderProgressBuffer {
    config: ProgressBufferConfig,
    state: RwLock<BufferState>,
    live: broadcast::Sender<ProgressEvent>,
}

impl OrderProgressBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new(config: ProgressBufferConfig) -> Self {
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            config,
            state: RwLock::new(BufferState::default()),
            live,
        }
    }

    /// Buffer settings.
    #[must_use]
    pub const fn config(&self) -> &ProgressBufferConfig {
        &self.config
    }

    /// Buffer one queue event received at `now`.
    ///
    /// Returns `false` when the job id does not belong to an order.
    pub fn record(&self, event: &QueueEvent, now: Timestamp) -> bool {
        let Some((order_id, event_type, data)) = demultiplex(event) else {
            tracing::trace!(job_id = %event.job_id(), "Ignoring event for foreign job");
            return false;
        };

        let mut state = self.state.write();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let buffered = ProgressEvent {
            sequence,
            order_id: order_id.clone(),
            event_type,
            timestamp: now,
            data,
        };

        let events = state.orders.entry(order_id.clone()).or_default();
        events.push_back(buffered.clone());
        while events.len() > self.config.max_events_per_order {
            events.pop_front();
        }
        let order_count = state.orders.len();

        // Published under the write lock so `replay_and_subscribe` never misses an event.
        let _ = self.live.send(buffered);
        drop(state);

        update_buffered_orders(order_count);
        tracing::debug!(order_id = %order_id, event_type = ?event_type, "Buffered order event");
        true
    }

    /// Buffered events for an order, oldest first. Empty for unknown orders.
    #[must_use]
    pub fn get_events(&self, order_id: &OrderId) -> Vec<ProgressEvent> {
        self.state
            .read()
            .orders
            .get(order_id)
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot an order's history and subscribe to everything buffered after it.
    ///
    /// The live receiver carries events for every order; callers filter by
    /// order id and skip sequences already replayed.
    #[must_use]
    pub fn replay_and_subscribe(
        &self,
        order_id: &OrderId,
    ) -> (Vec<ProgressEvent>, broadcast::Receiver<ProgressEvent>) {
        let state = self.state.read();
        let receiver = self.live.subscribe();
        let events = state
            .orders
            .get(order_id)
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default();
        (events, receiver)
    }

    /// Drop an order's history.
    pub fn clear_events(&self, order_id: &OrderId) {
        let order_count = {
            let mut state = self.state.write();
            state.orders.remove(order_id);
            state.orders.len()
        };
        update_buffered_orders(order_count);
    }

    /// Number of orders with buffered events.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.read().orders.len()
    }

    /// Remove events older than the TTL; orders left empty are dropped.
    ///
    /// Returns the number of orders removed.
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let max_age = self.config.max_age;
        let (removed, order_count) = {
            let mut state = self.state.write();
            let before = state.orders.len();
            state.orders.retain(|_, events| {
                events.retain(|event| !event.timestamp.is_expired(now, max_age));
                !events.is_empty()
            });
            (before - state.orders.len(), state.orders.len())
        };

        update_buffered_orders(order_count);
        if removed > 0 {
            tracing::debug!(count = removed, "Cleaned up old order events");
        }
        removed
    }

    /// Start the subscription and sweep task.
    ///
    /// Runs until `shutdown` is cancelled or the event stream closes.
    pub fn spawn(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<QueueEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let buffer = Arc::clone(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let clock = RuntimeClock::start();
            let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
            sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    result = events.recv() => {
                        match result {
                            Ok(event) => {
                                buffer.record(&event, clock.now());
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(skipped = n, "Progress buffer lagged, skipped {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                tracing::info!("Queue event stream closed");
                                break;
                            }
                        }
                    }
                    _ = sweep.tick() => {
                        buffer.sweep_expired(clock.now());
                    }
                    () = shutdown.cancelled() => {
                        tracing::info!("Progress buffer shutting down");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::JobId;
    use proptest::prelude::*;

    fn job(order: &str) -> JobId {
        JobId::for_order(&OrderId::new(order))
    }

    fn progress(order: &str, step: u64) -> QueueEvent {
        QueueEvent::Progress {
            job_id: job(order),
            data: serde_json::json!({ "step": step }),
        }
    }

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_unix_millis(millis)
    }

    #[test]
    fn demultiplexes_by_job_id_prefix() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());

        assert!(buffer.record(&QueueEvent::Waiting { job_id: job("a") }, at(0)));
        assert!(buffer.record(&progress("b", 1), at(0)));
        assert!(!buffer.record(
            &QueueEvent::Waiting {
                job_id: JobId::new("other_job_a"),
            },
            at(0)
        ));

        let events = buffer.get_events(&OrderId::new("a"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, ProgressEventType::Waiting);
        assert_eq!(events[0].data, serde_json::json!({ "status": "pending" }));
        assert_eq!(buffer.order_count(), 2);
    }

    #[test]
    fn unknown_order_has_no_events() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        assert!(buffer.get_events(&OrderId::new("missing")).is_empty());
    }

    #[test]
    fn reads_are_repeatable() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        buffer.record(&progress("a", 1), at(0));

        let first = buffer.get_events(&OrderId::new("a"));
        let second = buffer.get_events(&OrderId::new("a"));
        assert_eq!(first, second);
    }

    #[test]
    fn evicts_oldest_over_capacity() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        for step in 0..105 {
            buffer.record(&progress("a", step), at(0));
        }

        let events = buffer.get_events(&OrderId::new("a"));
        assert_eq!(events.len(), 100);
        assert_eq!(events[0].data["step"], 5);
        assert_eq!(events[99].data["step"], 104);
    }

    #[test]
    fn sweep_drops_expired_events_and_empty_orders() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        buffer.record(&progress("old", 1), at(0));
        buffer.record(&progress("mixed", 1), at(0));
        buffer.record(&progress("mixed", 2), at(200_000));

        let removed = buffer.sweep_expired(at(300_000));

        assert_eq!(removed, 1);
        assert!(buffer.get_events(&OrderId::new("old")).is_empty());
        let mixed = buffer.get_events(&OrderId::new("mixed"));
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].data["step"], 2);
    }

    #[test]
    fn event_exactly_at_max_age_is_expired() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        buffer.record(&progress("a", 1), at(0));

        assert_eq!(buffer.sweep_expired(at(299_999)), 0);
        assert_eq!(buffer.sweep_expired(at(300_000)), 1);
    }

    #[test]
    fn terminal_events_are_not_special() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        let job_id = job("a");
        buffer.record(
            &QueueEvent::Failed {
                job_id: job_id.clone(),
                failed_reason: r#"{"status":"failed"}"#.to_string(),
            },
            at(0),
        );
        buffer.record(&progress("a", 2), at(0));
        buffer.record(
            &QueueEvent::Completed {
                job_id,
                return_value: serde_json::json!({ "status": "confirmed" }),
            },
            at(0),
        );

        let events = buffer.get_events(&OrderId::new("a"));
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].to_message(), r#"{"status":"failed"}"#);
        assert_eq!(events[2].to_message(), r#"{"status":"confirmed"}"#);
        assert!(events[2].event_type.is_terminal());
    }

    #[test]
    fn clear_events_removes_order() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        buffer.record(&progress("a", 1), at(0));
        buffer.clear_events(&OrderId::new("a"));
        assert_eq!(buffer.order_count(), 0);
    }

    #[tokio::test]
    async fn replay_then_live_has_no_gap() {
        let buffer = OrderProgressBuffer::new(ProgressBufferConfig::default());
        buffer.record(&progress("a", 1), at(0));

        let (replayed, mut live) = buffer.replay_and_subscribe(&OrderId::new("a"));
        buffer.record(&progress("a", 2), at(0));

        assert_eq!(replayed.len(), 1);
        let next = live.recv().await.unwrap();
        assert_eq!(next.data["step"], 2);
        assert!(next.sequence > replayed[0].sequence);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_task_buffers_and_stops_on_shutdown() {
        let buffer = Arc::new(OrderProgressBuffer::new(ProgressBufferConfig::default()));
        let (tx, rx) = broadcast::channel(16);
        let shutdown = CancellationToken::new();
        let handle = buffer.spawn(rx, shutdown.clone());

        tx.send(QueueEvent::Waiting { job_id: job("a") }).unwrap();
        tx.send(progress("a", 1)).unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(buffer.get_events(&OrderId::new("a")).len(), 2);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sweep_expires_events_after_max_age() {
        let buffer = Arc::new(OrderProgressBuffer::new(ProgressBufferConfig::default()));
        let (tx, rx) = broadcast::channel(16);
        let shutdown = CancellationToken::new();
        let handle = buffer.spawn(rx, shutdown.clone());

        tx.send(QueueEvent::Waiting { job_id: job("a") }).unwrap();
        tokio::task::yield_now().await;
        assert_eq!(buffer.order_count(), 1);

        // Sweeps at 60s..240s find nothing old enough.
        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(buffer.get_events(&OrderId::new("a")).len(), 1);

        // The 300s sweep drops it.
        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(buffer.order_count(), 0);
        assert!(buffer.get_events(&OrderId::new("a")).is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(count in 0usize..300, capacity in 1usize..50) {
            let buffer = OrderProgressBuffer::new(ProgressBufferConfig {
                max_events_per_order: capacity,
                ..ProgressBufferConfig::default()
            });
            for step in 0..count {
                buffer.record(&progress("a", step as u64), at(0));
            }
            let events = buffer.get_events(&OrderId::new("a"));
            prop_assert_eq!(events.len(), count.min(capacity));
            prop_assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        }
    }
}
