//! BroadcastHub - Observer Fan-Out
//!
//! ## Responsibilities
//!
//! - Observer channel management (accept to disconnect/error)
//! - Best-effort broadcast of frame batches, heartbeats and events
//! - Pruning of failed observers without disturbing the rest
//!
//! Delivery is iterate-and-best-effort, never atomic-all-or-nothing: a
//! write failure on one channel removes that channel and nothing else.

use crate::models::{Event, FramePayload};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

const SERVER_NAME: &str = "Railway Video Surveillance System";

/// Wire messages pushed to observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    /// Sent once on accept
    Connection {
        status: String,
        timestamp: String,
        server: String,
    },
    /// One batch per tick when at least one camera produced a payload
    VideoFrames {
        data: Vec<FramePayload>,
        timestamp: String,
    },
    /// One per tick when no camera produced a payload
    Heartbeat {
        timestamp: String,
        active_cameras: usize,
        status: String,
    },
    /// Asynchronous event notification
    Event { data: Event },
}

impl HubMessage {
    pub fn connection() -> Self {
        HubMessage::Connection {
            status: "connected".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            server: SERVER_NAME.to_string(),
        }
    }

    pub fn video_frames(data: Vec<FramePayload>) -> Self {
        HubMessage::VideoFrames {
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn heartbeat(active_cameras: usize) -> Self {
        HubMessage::Heartbeat {
            timestamp: Utc::now().to_rfc3339(),
            active_cameras,
            status: "healthy".to_string(),
        }
    }

    pub fn event(event: Event) -> Self {
        HubMessage::Event { data: event }
    }
}

/// Observer connection
struct ObserverChannel {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// BroadcastHub instance
pub struct BroadcastHub {
    connections: RwLock<HashMap<Uuid, ObserverChannel>>,
    connection_count: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new observer. The connection confirmation is queued
    /// before the channel can see any other traffic.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        if let Ok(json) = serde_json::to_string(&HubMessage::connection()) {
            let _ = tx.send(json);
        }

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ObserverChannel { id, tx });
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(connection_id = %id, "Observer connected");

        (id, rx)
    }

    /// Unregister an observer (client close or handler exit)
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Observer disconnected");
        }
    }

    /// Broadcast a message to every observer, best-effort.
    ///
    /// A failed send means the observer's receiving task is gone; those
    /// channels are removed after the pass so a dead observer never costs
    /// the others their delivery.
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let failed: Vec<Uuid> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.tx.send(json.clone()).is_err())
                .map(|conn| conn.id)
                .collect()
        };

        for id in failed {
            tracing::warn!(connection_id = %id, "Observer write failed, removing");
            self.unregister(&id).await;
        }
    }

    /// Current observer count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Close every observer channel (process shutdown)
    pub async fn close_all(&self) {
        let mut connections = self.connections.write().await;
        let count = connections.len();
        connections.clear();
        self.connection_count.store(0, Ordering::Relaxed);
        tracing::info!(closed = count, "All observer channels closed");
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_queues_connection_confirmation() {
        let hub = BroadcastHub::new();
        let (_id, mut rx) = hub.register().await;

        let first = rx.recv().await.unwrap();
        let msg: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(msg["type"], "connection");
        assert_eq!(msg["status"], "connected");
    }

    #[tokio::test]
    async fn dead_observer_does_not_block_live_one() {
        let hub = BroadcastHub::new();
        let (_dead_id, dead_rx) = hub.register().await;
        let (_live_id, mut live_rx) = hub.register().await;
        drop(dead_rx);

        hub.broadcast(HubMessage::heartbeat(0)).await;

        // connection confirmation, then the heartbeat
        live_rx.recv().await.unwrap();
        let beat = live_rx.recv().await.unwrap();
        let msg: serde_json::Value = serde_json::from_str(&beat).unwrap();
        assert_eq!(msg["type"], "heartbeat");

        // dead channel was pruned in the same pass
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_to_empty_observer_set_is_a_no_op() {
        let hub = BroadcastHub::new();
        hub.broadcast(HubMessage::heartbeat(1)).await;
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = BroadcastHub::new();
        let (id, _rx) = hub.register().await;
        hub.unregister(&id).await;
        hub.unregister(&id).await;
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn video_frames_wire_shape() {
        let msg = HubMessage::video_frames(vec![]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "video_frames");
        assert!(json["data"].as_array().unwrap().is_empty());
        assert!(json["timestamp"].is_string());
    }
}
