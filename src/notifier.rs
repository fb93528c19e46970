//! Real-time fan-out of match updates.
//!
//! The synchronization loop publishes every merged [`Match`] on a topic equal
//! to its `match_id`. Delivery is best effort to subscribers connected at
//! publish time; there is no replay for late subscribers.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::db::models::Match;

/// Event name clients listen for.
pub const MATCH_UPDATE_EVENT: &str = "matchUpdate";

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Sink for match changes. Publishing is fire-and-forget and never fails
/// from the caller's point of view.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, topic: &str, payload: &Match);
}

/// A published match update, as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchUpdateEvent {
    pub topic: String,
    pub event: &'static str,
    pub payload: Match,
}

/// In-process notifier backed by a `tokio::sync::broadcast` channel.
///
/// When the buffer is full the oldest undelivered updates are dropped and
/// slow receivers observe `RecvError::Lagged`.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<MatchUpdateEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every topic. Receivers filter on `topic`.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchUpdateEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, topic: &str, payload: &Match) {
        let event = MatchUpdateEvent {
            topic: topic.to_string(),
            event: MATCH_UPDATE_EVENT,
            payload: payload.clone(),
        };
        // A send error only means nobody is listening right now.
        match self.sender.send(event) {
            Ok(n) => trace!("Published {} to {} subscriber(s)", topic, n),
            Err(_) => trace!("Published {} with no subscribers", topic),
        }
    }
}
