//! CameraRegistry - Running Unit Lifecycle
//!
//! ## Responsibilities
//!
//! - Process-wide table of running camera units, keyed by camera id
//! - Idempotent start, explicit stop outcomes, teardown at shutdown
//! - Copy-on-iterate snapshots for the tick loop
//!
//! At most one unit per camera id at any time. Starting an already-running
//! id reports the existing unit, never a duplicate. The lock is held only
//! for structural mutation, never across a capture or a send.

pub mod unit;

pub use unit::VideoUnit;

use crate::models::CameraRecord;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Start outcome (explicit non-error statuses)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { mock: bool },
    AlreadyRunning { mock: bool },
}

/// Stop outcome (explicit non-error statuses)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// CameraRegistry instance
pub struct CameraRegistry {
    units: RwLock<HashMap<String, Arc<VideoUnit>>>,
    capture_timeout: Duration,
}

impl CameraRegistry {
    pub fn new(capture_timeout: Duration) -> Self {
        Self {
            units: RwLock::new(HashMap::new()),
            capture_timeout,
        }
    }

    /// Start a unit for a camera record. Idempotent: an already-running id
    /// is reported, not restarted.
    pub async fn start(&self, record: &CameraRecord) -> StartOutcome {
        {
            let units = self.units.read().await;
            if let Some(existing) = units.get(&record.id) {
                return StartOutcome::AlreadyRunning {
                    mock: existing.using_fallback(),
                };
            }
        }

        // Source probe runs outside the lock; a concurrent start for the
        // same id is resolved at insert time.
        let unit = Arc::new(VideoUnit::open(record, self.capture_timeout).await);
        let mock = unit.using_fallback();

        let mut units = self.units.write().await;
        if let Some(existing) = units.get(&record.id) {
            return StartOutcome::AlreadyRunning {
                mock: existing.using_fallback(),
            };
        }
        units.insert(record.id.clone(), unit);

        tracing::info!(
            camera_id = %record.id,
            camera_name = %record.name,
            mock = mock,
            "Camera unit started"
        );
        StartOutcome::Started { mock }
    }

    /// Stop and remove a unit. The dropped unit releases its capture
    /// handle; the tick loop stops seeing it at its next snapshot.
    pub async fn stop(&self, camera_id: &str) -> StopOutcome {
        let mut units = self.units.write().await;
        match units.remove(camera_id) {
            Some(_) => {
                tracing::info!(camera_id = %camera_id, "Camera unit stopped");
                StopOutcome::Stopped
            }
            None => StopOutcome::NotRunning,
        }
    }

    /// Ids of currently running units
    pub async fn list(&self) -> Vec<String> {
        let units = self.units.read().await;
        units.keys().cloned().collect()
    }

    /// Copy-on-iterate snapshot for the tick loop
    pub async fn snapshot(&self) -> Vec<Arc<VideoUnit>> {
        let units = self.units.read().await;
        units.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.units.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.units.read().await.is_empty()
    }

    /// Stop every running unit (process shutdown)
    pub async fn teardown_all(&self) {
        let mut units = self.units.write().await;
        let count = units.len();
        units.clear();
        tracing::info!(stopped = count, "All camera units stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast_hub::BroadcastHub;
    use crate::error::Result;
    use crate::event_store::EventStore;
    use crate::event_trigger::EventSink;
    use crate::models::Event;
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
            location: "Platform 1".to_string(),
            // Unopenable locator: the unit starts in fallback mode.
            source: "unavailable://nowhere".to_string(),
            gps_lat: 0.0,
            gps_lng: 0.0,
            fps: 10,
        }
    }

    fn sink() -> EventSink {
        EventSink::new(Arc::new(NullStore), Arc::new(BroadcastHub::new()))
    }

    fn registry() -> CameraRegistry {
        CameraRegistry::new(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn invalid_locator_starts_in_fallback_mode() {
        let registry = registry();
        let outcome = registry.start(&record("cam-1")).await;
        assert_eq!(outcome, StartOutcome::Started { mock: true });

        let payload = registry.snapshot().await[0].produce(&sink()).await.unwrap();
        assert!(payload.mock);
    }

    #[tokio::test]
    async fn double_start_reports_existing_unit() {
        let registry = registry();
        registry.start(&record("cam-1")).await;
        let outcome = registry.start(&record("cam-1")).await;
        assert_eq!(outcome, StartOutcome::AlreadyRunning { mock: true });
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn stop_removes_from_list() {
        let registry = registry();
        registry.start(&record("cam-1")).await;
        assert_eq!(registry.list().await, vec!["cam-1".to_string()]);

        assert_eq!(registry.stop("cam-1").await, StopOutcome::Stopped);
        assert!(registry.list().await.is_empty());
        assert!(registry.snapshot().await.is_empty());

        assert_eq!(registry.stop("cam-1").await, StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn frame_count_is_monotonic_and_resets_on_restart() {
        let registry = registry();
        let sink = sink();

        registry.start(&record("cam-1")).await;
        let unit = registry.snapshot().await.remove(0);
        assert_eq!(unit.produce(&sink).await.unwrap().frame_count, 1);
        assert_eq!(unit.produce(&sink).await.unwrap().frame_count, 2);
        assert_eq!(unit.produce(&sink).await.unwrap().frame_count, 3);

        registry.stop("cam-1").await;
        registry.start(&record("cam-1")).await;
        let fresh = registry.snapshot().await.remove(0);
        assert_eq!(fresh.produce(&sink).await.unwrap().frame_count, 1);
    }

    #[tokio::test]
    async fn teardown_stops_everything() {
        let registry = registry();
        registry.start(&record("cam-1")).await;
        registry.start(&record("cam-2")).await;
        assert_eq!(registry.len().await, 2);

        registry.teardown_all().await;
        assert!(registry.is_empty().await);
    }
}
