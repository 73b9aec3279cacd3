//! StreamOrchestrator - Fixed-Cadence Fan-Out Loop
//!
//! ## Responsibilities
//!
//! - One tick per period (nominal 100 ms): pull one frame per running unit
//! - Broadcast the batch, or a heartbeat when no camera produced a payload
//! - Per-camera failure isolation: one stalled or failing unit degrades
//!   only itself
//!
//! An overrun tick is followed immediately by the next one rather than
//! being skipped, so batch ordering per camera and per observer holds even
//! under lag.

use crate::broadcast_hub::{BroadcastHub, HubMessage};
use crate::camera_registry::CameraRegistry;
use crate::event_trigger::EventSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

/// StreamOrchestrator instance
pub struct StreamOrchestrator {
    registry: Arc<CameraRegistry>,
    hub: Arc<BroadcastHub>,
    sink: EventSink,
    tick_period: Duration,
    running: Arc<RwLock<bool>>,
}

impl StreamOrchestrator {
    pub fn new(
        registry: Arc<CameraRegistry>,
        hub: Arc<BroadcastHub>,
        sink: EventSink,
        tick_period: Duration,
    ) -> Self {
        Self {
            registry,
            hub,
            sink,
            tick_period,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the fan-out loop
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Stream orchestrator already running");
                return;
            }
            *running = true;
        }

        tracing::info!(tick_ms = self.tick_period.as_millis() as u64, "Starting stream orchestrator");

        let registry = self.registry.clone();
        let hub = self.hub.clone();
        let sink = self.sink.clone();
        let running = self.running.clone();
        let tick_period = self.tick_period;

        tokio::spawn(async move {
            let mut interval = interval(tick_period);

            loop {
                interval.tick().await;

                {
                    let is_running = running.read().await;
                    if !*is_running {
                        break;
                    }
                }

                Self::run_tick(&registry, &hub, &sink).await;
            }

            tracing::info!("Stream orchestrator stopped");
        });
    }

    /// Stop the loop at its next tick
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping stream orchestrator");
    }

    /// Run exactly one tick. Returns the number of payloads delivered.
    pub async fn tick_once(&self) -> usize {
        Self::run_tick(&self.registry, &self.hub, &self.sink).await
    }

    async fn run_tick(
        registry: &CameraRegistry,
        hub: &BroadcastHub,
        sink: &EventSink,
    ) -> usize {
        let units = registry.snapshot().await;
        let active_cameras = units.len();

        let mut payloads = Vec::with_capacity(active_cameras);
        for unit in units {
            // produce applies the per-stage policy itself; a camera that
            // yields nothing this tick is simply absent from the batch.
            if let Some(payload) = unit.produce(sink).await {
                payloads.push(payload);
            }
        }

        let delivered = payloads.len();
        if delivered > 0 {
            hub.broadcast(HubMessage::video_frames(payloads)).await;
        } else {
            hub.broadcast(HubMessage::heartbeat(active_cameras)).await;
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::event_store::EventStore;
    use crate::models::{CameraRecord, Event};
    use async_trait::async_trait;

    struct NullStore;

    #[async_trait]
    impl EventStore for NullStore {
        async fn insert_event(&self, _event: &Event) -> Result<()> {
            Ok(())
        }

        async fn camera(&self, _camera_id: &str) -> Result<Option<CameraRecord>> {
            Ok(None)
        }
    }

    fn record(id: &str) -> CameraRecord {
        CameraRecord {
            id: id.to_string(),
            name: format!("Camera {}", id),
            location: "Platform 2".to_string(),
            source: "unavailable://nowhere".to_string(),
            gps_lat: 0.0,
            gps_lng: 0.0,
            fps: 10,
        }
    }

    fn orchestrator(
        registry: Arc<CameraRegistry>,
        hub: Arc<BroadcastHub>,
    ) -> StreamOrchestrator {
        let sink = EventSink::new(Arc::new(NullStore), hub.clone());
        StreamOrchestrator::new(registry, hub, sink, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn tick_with_camera_but_no_observers_runs_clean() {
        let registry = Arc::new(CameraRegistry::new(Duration::from_secs(2)));
        registry.start(&record("cam-1")).await;
        let hub = Arc::new(BroadcastHub::new());

        let orch = orchestrator(registry, hub.clone());
        assert_eq!(orch.tick_once().await, 1);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn observers_receive_the_batch() {
        let registry = Arc::new(CameraRegistry::new(Duration::from_secs(2)));
        registry.start(&record("cam-1")).await;
        registry.start(&record("cam-2")).await;
        let hub = Arc::new(BroadcastHub::new());
        let (_id, mut rx) = hub.register().await;
        rx.recv().await.unwrap(); // connection confirmation

        let orch = orchestrator(registry, hub);
        assert_eq!(orch.tick_once().await, 2);

        let raw = rx.recv().await.unwrap();
        let msg: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg["type"], "video_frames");
        assert_eq!(msg["data"].as_array().unwrap().len(), 2);
        assert_eq!(msg["data"][0]["mock"], true);
    }

    #[tokio::test]
    async fn empty_registry_sends_heartbeat() {
        let registry = Arc::new(CameraRegistry::new(Duration::from_secs(2)));
        let hub = Arc::new(BroadcastHub::new());
        let (_id, mut rx) = hub.register().await;
        rx.recv().await.unwrap();

        let orch = orchestrator(registry, hub);
        assert_eq!(orch.tick_once().await, 0);

        let raw = rx.recv().await.unwrap();
        let msg: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg["type"], "heartbeat");
        assert_eq!(msg["active_cameras"], 0);
        assert_eq!(msg["status"], "healthy");
    }

    #[tokio::test]
    async fn stopped_camera_disappears_from_the_next_batch() {
        let registry = Arc::new(CameraRegistry::new(Duration::from_secs(2)));
        registry.start(&record("cam-1")).await;
        registry.start(&record("cam-2")).await;
        let hub = Arc::new(BroadcastHub::new());

        let orch = orchestrator(registry.clone(), hub);
        assert_eq!(orch.tick_once().await, 2);

        registry.stop("cam-2").await;
        assert_eq!(orch.tick_once().await, 1);
    }
}
