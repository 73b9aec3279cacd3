//! Railway Video Surveillance Camserver Library
//!
//! ## Architecture (8 Components)
//!
//! 1. CameraSource - Physical/synthetic frame capture with fallback
//! 2. MotionDetector - Per-camera background model
//! 3. EventTrigger - Rate-limited event emission + dispatch
//! 4. FrameCodec - JPEG/base64 transport encoding
//! 5. CameraRegistry - Running unit lifecycle
//! 6. BroadcastHub - Observer fan-out
//! 7. StreamOrchestrator - Fixed-cadence tick loop
//! 8. WebAPI - Control surface + WebSocket endpoint
//!
//! ## Design Principles
//!
//! - One stalled camera or observer degrades only itself
//! - Frame drops under load are acceptable; event drops are not
//! - Fallback to the synthetic feed is a healthy operating mode

pub mod broadcast_hub;
pub mod camera_registry;
pub mod camera_source;
pub mod event_store;
pub mod event_trigger;
pub mod frame_codec;
pub mod models;
pub mod motion_detector;
pub mod stream_orchestrator;
pub mod web_api;
pub mod error;
pub mod state;

pub use error::{Error, Result};
pub use state::AppState;
