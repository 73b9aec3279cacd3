//! Running unit: one camera's source + detector + trigger bundle

use crate::camera_source::CameraFeed;
use crate::event_trigger::{EventSink, EventTrigger};
use crate::frame_codec;
use crate::models::{CameraRecord, FramePayload};
use crate::motion_detector::MotionDetector;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// State guarded by the unit's lock: the feed and the per-frame pipeline
struct UnitInner {
    feed: CameraFeed,
    detector: MotionDetector,
    trigger: EventTrigger,
}

/// One running camera unit.
///
/// Created by the registry on start, destroyed on stop; a restart gets a
/// fresh unit with reset detector, cooldown and frame counter.
pub struct VideoUnit {
    camera_id: String,
    camera_name: String,
    fps: u32,
    frame_count: AtomicU64,
    using_fallback: AtomicBool,
    inner: Mutex<UnitInner>,
}

impl VideoUnit {
    /// Open the physical source, falling back permanently to the synthetic
    /// feed when the locator is unavailable. Never fails: fallback is a
    /// healthy operating mode.
    pub async fn open(record: &CameraRecord, capture_timeout: Duration) -> Self {
        let (feed, using_fallback) = match CameraFeed::open(&record.source, capture_timeout).await {
            Ok(feed) => (feed, false),
            Err(e) => {
                tracing::warn!(
                    camera_id = %record.id,
                    source = %record.source,
                    error = %e,
                    "Camera source not available, using synthetic feed"
                );
                (CameraFeed::synthetic(), true)
            }
        };
        Self::with_feed(record, feed, using_fallback)
    }

    /// Build a unit around an already-opened feed
    pub fn with_feed(record: &CameraRecord, feed: CameraFeed, using_fallback: bool) -> Self {
        Self {
            camera_id: record.id.clone(),
            camera_name: record.name.clone(),
            fps: record.fps,
            frame_count: AtomicU64::new(0),
            using_fallback: AtomicBool::new(using_fallback),
            inner: Mutex::new(UnitInner {
                feed,
                detector: MotionDetector::new(),
                trigger: EventTrigger::new(record.id.clone()),
            }),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::Relaxed)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    /// Produce this tick's payload: capture, detect, trigger, encode.
    ///
    /// Capture failure switches to the synthetic feed for the rest of the
    /// unit's life. Encode failure skips this camera for the tick only.
    /// Event emission is fire-and-forget through the sink and can never
    /// fail this path.
    pub async fn produce(&self, sink: &EventSink) -> Option<FramePayload> {
        let mut inner = self.inner.lock().await;

        let frame = match inner.feed.read_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    camera_id = %self.camera_id,
                    error = %e,
                    "Frame read failed, switching to synthetic feed"
                );
                inner.feed = CameraFeed::synthetic();
                self.using_fallback.store(true, Ordering::Relaxed);
                match inner.feed.read_frame().await {
                    Ok(frame) => frame,
                    // The synthetic feed cannot fail; skip the tick if it
                    // somehow does.
                    Err(_) => return None,
                }
            }
        };

        if let Some(magnitude) = inner.detector.observe(&frame) {
            if let Some(draft) = inner.trigger.on_motion(magnitude, Instant::now()) {
                sink.dispatch(draft);
            }
        }

        let frame_count = self.frame_count.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(draft) = inner.trigger.on_frame_count(frame_count) {
            sink.dispatch(draft);
        }

        let mock = inner.feed.is_mock();
        let encoded = match frame_codec::encode_base64(&frame) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(
                    camera_id = %self.camera_id,
                    error = %e,
                    "Frame encoding failed, skipping this tick"
                );
                return None;
            }
        };

        Some(FramePayload {
            camera_id: self.camera_id.clone(),
            camera_name: self.camera_name.clone(),
            frame: encoded,
            timestamp: frame.captured_at.to_rfc3339(),
            frame_count,
            fps: self.fps,
            mock,
        })
    }
}
