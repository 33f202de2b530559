//! Realtime broadcast channel.
//!
//! One explicitly constructed fan-out instance lives in `AppState` and is
//! handed to every publisher. Delivery is at-most-once to currently
//! connected subscribers; there is no persistence or replay, so clients
//! re-fetch state on reconnect.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events pushed to connected WebSocket clients. Bid updates and chat
/// messages share the channel but are separate namespaces on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    NewBid {
        listing_id: Uuid,
        current_bid: f64,
        bidder_email: String,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_email: String,
        body: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Publish to all current subscribers. A send error only means nobody
    /// is connected, which is not a failure.
    pub fn publish(&self, event: ServerEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No subscribers for event: {}", e);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
