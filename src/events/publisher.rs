//! Broadcast-based publisher for run lifecycle events.
//!
//! Subscribers each hold an independent receiver, so a slow or failing
//! subscriber can never interrupt delivery to the others or the run itself;
//! it only loses its own backlog once the channel capacity is exceeded.

use serde_json::Value;
use tokio::sync::broadcast;

/// High-throughput event publisher for lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    /// One of the names in [`crate::constants::events`]
    pub name: String,
    /// Progress snapshot and event-specific fields
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event with the given name and context.
    ///
    /// Publishing with no subscribers is not an error; events are emitted
    /// whether or not anyone is listening.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };
        if let Err(broadcast::error::SendError(_)) = self.sender.send(event) {
            // No subscribers currently registered
        }
    }

    /// Subscribe to all events from this point on
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
