//! Per-meeting publish/subscribe channels.
//!
//! One bounded broadcast channel per meeting, keyed `meeting:<id>`. Messages
//! are serialized JSON strings; delivery is in publish order per channel and
//! only reaches subscribers connected at publish time. Slow subscribers fall
//! behind into `Lagged` (oldest messages dropped) rather than blocking the
//! publisher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Queue depth per channel before drop-oldest kicks in.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct ChannelHub {
    inner: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub {
    pub fn new() -> Self {
        ChannelHub {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn channel_name(meeting_id: &str) -> String {
        format!("meeting:{meeting_id}")
    }

    /// Fire-and-forget publish. Messages published while no subscriber is
    /// listening are dropped.
    pub fn publish(&self, meeting_id: &str, payload: String) {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = map.get(&Self::channel_name(meeting_id)) {
            // Send only errors when there are no receivers
            let _ = sender.send(payload);
        }
    }

    /// Subscribe to a meeting's channel, creating it on first use.
    pub fn subscribe(&self, meeting_id: &str) -> broadcast::Receiver<String> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(Self::channel_name(meeting_id))
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drop the channel entry once its last subscriber is gone. Called from
    /// connection cleanup so ended meetings do not accumulate senders.
    pub fn prune(&self, meeting_id: &str) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let name = Self::channel_name(meeting_id);
        if map.get(&name).is_some_and(|s| s.receiver_count() == 0) {
            map.remove(&name);
        }
    }

    /// Number of live subscribers for a meeting.
    pub fn subscriber_count(&self, meeting_id: &str) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&Self::channel_name(meeting_id))
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}
