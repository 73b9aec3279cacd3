//! Shared data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Camera identity record (owned by storage, read-only to the core)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRecord {
    pub id: String,
    pub name: String,
    pub location: String,
    /// Device index ("0") or network URL (rtsp://..., http://...)
    pub source: String,
    pub gps_lat: f64,
    pub gps_lng: f64,
    pub fps: u32,
}

/// Event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Motion,
    Drowsiness,
    Panic,
    Intrusion,
    CrowdGathering,
    AbandonedObject,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Motion => "motion",
            EventType::Drowsiness => "drowsiness",
            EventType::Panic => "panic",
            EventType::Intrusion => "intrusion",
            EventType::CrowdGathering => "crowd_gathering",
            EventType::AbandonedObject => "abandoned_object",
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Detection event, immutable once built.
///
/// Acknowledgement fields are written by the REST layer, never by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub camera_id: String,
    pub camera_name: String,
    pub event_type: EventType,
    pub description: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub gps_lat: f64,
    pub gps_lng: f64,
    pub is_acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub severity: Severity,
}

/// One camera's contribution to a tick's frame batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    pub camera_id: String,
    pub camera_name: String,
    /// Base64-encoded JPEG
    pub frame: String,
    pub timestamp: String,
    pub frame_count: u64,
    pub fps: u32,
    pub mock: bool,
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> ApiResponse<T> {
        ApiResponse {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// API error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_cameras: usize,
    pub connected_clients: u64,
    pub db_connected: bool,
}
