//! Fan-out of MQTT messages to WebSocket clients
//!
//! Backed by a tokio broadcast channel. Each WebSocket connection holds one
//! receiver, so the receiver count doubles as the connected client count.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// A message forwarded to WebSocket clients, `{"topic", "payload"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TelemetryMessage {
    pub topic: String,
    pub payload: Value,
}

/// Broadcaster for live telemetry
#[derive(Clone)]
pub(crate) struct TelemetryBroadcaster {
    sender: broadcast::Sender<TelemetryMessage>,
}

impl TelemetryBroadcaster {
    /// Create a new broadcaster buffering up to `capacity` messages per client.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send a message to every connected client.
    pub fn broadcast(&self, message: TelemetryMessage) {
        // No receivers is not an error
        let _ = self.sender.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryMessage> {
        self.sender.subscribe()
    }

    /// Number of connected WebSocket clients.
    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
