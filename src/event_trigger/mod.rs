//! EventTrigger - Rate-Limited Event Emission
//!
//! ## Responsibilities
//!
//! - Turn motion magnitudes into motion events under a 5s cooldown
//! - Periodic synthetic events to exercise the notification pipeline
//! - Fire-and-forget dispatch: persist best-effort, then broadcast
//!
//! Emission never propagates an error back into the frame path. An
//! observer may see an event the store failed to record; real-time
//! notification wins over strict durability here.

use crate::broadcast_hub::{BroadcastHub, HubMessage};
use crate::event_store::EventStore;
use crate::models::{Event, EventType, Severity};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Foreground pixel count above which motion is significant
pub const MOTION_THRESHOLD: u32 = 2000;
/// Minimum wall-clock interval between motion events for one unit
pub const MOTION_COOLDOWN: Duration = Duration::from_secs(5);
/// Synthetic event period in frames (~2 minutes at the 10 Hz tick)
pub const SYNTHETIC_EVENT_PERIOD: u64 = 1200;

/// Event data decided by the trigger, before storage stamps identity
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub camera_id: String,
    pub event_type: EventType,
    pub description: String,
    pub confidence: f64,
    pub severity: Severity,
}

/// Per-unit trigger state
pub struct EventTrigger {
    camera_id: String,
    last_motion_at: Option<Instant>,
}

impl EventTrigger {
    pub fn new(camera_id: String) -> Self {
        Self {
            camera_id,
            last_motion_at: None,
        }
    }

    /// Motion path. Fires when the magnitude exceeds the threshold and the
    /// cooldown has elapsed; the cooldown clock resets on emit only, not on
    /// every over-threshold frame.
    pub fn on_motion(&mut self, magnitude: u32, now: Instant) -> Option<EventDraft> {
        if magnitude <= MOTION_THRESHOLD {
            return None;
        }
        if let Some(last) = self.last_motion_at {
            if now.duration_since(last) < MOTION_COOLDOWN {
                return None;
            }
        }
        self.last_motion_at = Some(now);

        Some(EventDraft {
            camera_id: self.camera_id.clone(),
            event_type: EventType::Motion,
            description: format!("Significant motion detected (area: {} pixels)", magnitude),
            confidence: (magnitude as f64 / 10_000.0).min(0.95),
            severity: Severity::Medium,
        })
    }

    /// Periodic synthetic path, independent of the motion cooldown.
    ///
    /// Frame-count based rather than wall-clock based, so its cadence
    /// follows the tick rate.
    pub fn on_frame_count(&self, frame_count: u64) -> Option<EventDraft> {
        if frame_count == 0 || frame_count % SYNTHETIC_EVENT_PERIOD != 0 {
            return None;
        }

        let mut rng = rand::thread_rng();
        let event_type = *[
            EventType::CrowdGathering,
            EventType::Drowsiness,
            EventType::Panic,
        ]
        .choose(&mut rng)
        .unwrap_or(&EventType::CrowdGathering);

        let description = match event_type {
            EventType::CrowdGathering => "Crowd gathering detected on platform",
            EventType::Drowsiness => "Driver drowsiness pattern detected",
            _ => "Unusual crowd behavior pattern detected",
        };

        let severity = *[Severity::Medium, Severity::High]
            .choose(&mut rng)
            .unwrap_or(&Severity::Medium);

        Some(EventDraft {
            camera_id: self.camera_id.clone(),
            event_type,
            description: description.to_string(),
            confidence: rng.gen_range(0.7..0.95),
            severity,
        })
    }
}

/// Dispatch half of the trigger: storage + hub, both best-effort
#[derive(Clone)]
pub struct EventSink {
    store: Arc<dyn EventStore>,
    hub: Arc<BroadcastHub>,
}

impl EventSink {
    pub fn new(store: Arc<dyn EventStore>, hub: Arc<BroadcastHub>) -> Self {
        Self { store, hub }
    }

    /// Emit one event asynchronously. Reads the camera identity record to
    /// stamp name and geo-coordinates, persists, then notifies observers.
    /// Persistence failure is logged and swallowed; delivery still fires.
    pub fn dispatch(&self, draft: EventDraft) {
        let store = self.store.clone();
        let hub = self.hub.clone();

        tokio::spawn(async move {
            let camera = match store.camera(&draft.camera_id).await {
                Ok(camera) => camera,
                Err(e) => {
                    tracing::warn!(
                        camera_id = %draft.camera_id,
                        error = %e,
                        "Camera record lookup failed for event"
                    );
                    None
                }
            };
            let (camera_name, gps_lat, gps_lng) = camera
                .map(|c| (c.name, c.gps_lat, c.gps_lng))
                .unwrap_or_else(|| ("Unknown Camera".to_string(), 0.0, 0.0));

            let event = Event {
                id: Uuid::new_v4().to_string(),
                camera_id: draft.camera_id,
                camera_name,
                event_type: draft.event_type,
                description: draft.description,
                confidence: draft.confidence,
                timestamp: Utc::now(),
                gps_lat,
                gps_lng,
                is_acknowledged: false,
                acknowledged_by: None,
                acknowledged_at: None,
                severity: draft.severity,
            };

            if let Err(e) = store.insert_event(&event).await {
                tracing::warn!(
                    camera_id = %event.camera_id,
                    error = %e,
                    "Event persistence failed, notifying observers anyway"
                );
            }

            tracing::info!(
                camera_id = %event.camera_id,
                event_type = %event.event_type.as_str(),
                severity = %event.severity.as_str(),
                confidence = event.confidence,
                "Event emitted"
            );

            hub.broadcast(HubMessage::event(event)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::models::CameraRecord;
    use async_trait::async_trait;

    #[test]
    fn motion_below_threshold_never_fires() {
        let mut trigger = EventTrigger::new("cam-1".to_string());
        assert!(trigger.on_motion(2000, Instant::now()).is_none());
        assert!(trigger.on_motion(500, Instant::now()).is_none());
    }

    #[test]
    fn one_burst_within_cooldown_emits_exactly_one_event() {
        let mut trigger = EventTrigger::new("cam-1".to_string());
        let t0 = Instant::now();

        let mut emitted = 0;
        if trigger.on_motion(2500, t0).is_some() {
            emitted += 1;
        }
        // Nine quieter frame pairs over the next 3 seconds
        for i in 1..=9u64 {
            let t = t0 + Duration::from_millis(i * 300);
            if trigger.on_motion(500, t).is_some() {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 1);
    }

    #[test]
    fn over_threshold_frames_inside_cooldown_are_suppressed() {
        let mut trigger = EventTrigger::new("cam-1".to_string());
        let t0 = Instant::now();

        assert!(trigger.on_motion(2500, t0).is_some());
        assert!(trigger.on_motion(3000, t0 + Duration::from_secs(2)).is_none());
        assert!(trigger.on_motion(3000, t0 + Duration::from_secs(4)).is_none());
        // Cooldown expired; clock was not reset by the suppressed frames
        assert!(trigger.on_motion(3000, t0 + Duration::from_secs(5)).is_some());
    }

    #[test]
    fn motion_confidence_is_capped() {
        let mut trigger = EventTrigger::new("cam-1".to_string());
        let draft = trigger.on_motion(50_000, Instant::now()).unwrap();
        assert_eq!(draft.confidence, 0.95);
        assert_eq!(draft.severity, Severity::Medium);
        assert!(draft.description.contains("50000 pixels"));
    }

    #[test]
    fn synthetic_path_fires_on_period_boundaries_only() {
        let trigger = EventTrigger::new("cam-1".to_string());
        assert!(trigger.on_frame_count(0).is_none());
        assert!(trigger.on_frame_count(1).is_none());
        assert!(trigger.on_frame_count(1199).is_none());

        let draft = trigger.on_frame_count(1200).unwrap();
        assert!(matches!(
            draft.event_type,
            EventType::CrowdGathering | EventType::Drowsiness | EventType::Panic
        ));
        assert!(draft.confidence >= 0.7 && draft.confidence < 0.95);
        assert!(matches!(draft.severity, Severity::Medium | Severity::High));

        assert!(trigger.on_frame_count(2400).is_some());
    }

    /// Store whose writes always fail, to exercise the swallow policy
    struct FailingStore;

    #[async_trait]
    impl EventStore for FailingStore {
        async fn insert_event(&self, _event: &Event) -> Result<()> {
            Err(Error::Internal("store offline".to_string()))
        }

        async fn camera(&self, camera_id: &str) -> Result<Option<CameraRecord>> {
            Ok(Some(CameraRecord {
                id: camera_id.to_string(),
                name: "Platform 1".to_string(),
                location: "North".to_string(),
                source: "0".to_string(),
                gps_lat: 28.6,
                gps_lng: 77.2,
                fps: 10,
            }))
        }
    }

    #[tokio::test]
    async fn delivery_fires_even_when_persistence_fails() {
        let hub = Arc::new(BroadcastHub::new());
        let (_id, mut rx) = hub.register().await;
        rx.recv().await.unwrap(); // connection confirmation

        let sink = EventSink::new(Arc::new(FailingStore), hub);
        let mut trigger = EventTrigger::new("cam-1".to_string());
        sink.dispatch(trigger.on_motion(2500, Instant::now()).unwrap());

        let raw = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let msg: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg["type"], "event");
        assert_eq!(msg["data"]["event_type"], "motion");
        assert_eq!(msg["data"]["camera_name"], "Platform 1");
        assert_eq!(msg["data"]["is_acknowledged"], false);
    }
}
