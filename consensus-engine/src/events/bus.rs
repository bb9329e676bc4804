//! Event bus for engine progress
//!
//! Provides pub/sub messaging using Tokio broadcast channels.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::DebateEvent;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Receiver of engine events.
///
/// `publish` is called synchronously from the engine at phase and round
/// boundaries, before the next boundary check runs.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DebateEvent);
}

/// Shared reference to an event sink
pub type SharedEventSink = Arc<dyn EventSink>;

/// Event bus with broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<DebateEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<DebateEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: DebateEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "Event published"),
            // No receivers is OK
            Err(_) => debug!(event_type, "Event published (no receivers)"),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn finished() -> DebateEvent {
        DebateEvent::VerificationCompleted {
            invocation_id: Uuid::nil(),
            passed: true,
            corrections: 1,
            confidence: 0.85,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(finished());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "verification_completed");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(finished());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
