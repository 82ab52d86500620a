//! Application-wide "history changed" event bus.

use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio::sync::broadcast;

/// Name of the event, as pushed to browser clients.
pub const CHAT_HISTORY_UPDATED: &str = "chat-history-updated";

const EVENT_CAPACITY: usize = 64;

/// A chat was created or deleted somewhere. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryUpdated;

impl Serialize for HistoryUpdated {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("type", CHAT_HISTORY_UPDATED)?;
        map.end()
    }
}

/// Broadcast bus for [`HistoryUpdated`]. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct HistoryEvents {
    tx: broadcast::Sender<HistoryUpdated>,
}

impl HistoryEvents {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    /// A bus that buffers at most `capacity` undelivered events per listener.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Announce a history change. Returns how many listeners were reached.
    pub fn publish(&self) -> usize {
        self.tx.send(HistoryUpdated).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryUpdated> {
        self.tx.subscribe()
    }
}

impl Default for HistoryEvents {
    fn default() -> Self {
        Self::new()
    }
}
