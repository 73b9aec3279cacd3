//! EventStore - Storage Collaborator Interface
//!
//! ## Responsibilities
//!
//! - Persist detection events
//! - Read camera identity records (name/locator/gps) for the core
//!
//! The core only consumes this narrow interface; record CRUD lives in the
//! REST layer outside this crate.

use crate::error::Result;
use crate::models::{CameraRecord, Event};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row};

/// Storage collaborator consumed by the core
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one event
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Read a camera identity record
    async fn camera(&self, camera_id: &str) -> Result<Option<CameraRecord>>;
}

/// MySQL-backed store
pub struct MySqlEventStore {
    pool: MySqlPool,
}

impl MySqlEventStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for MySqlEventStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events
                (id, camera_id, camera_name, event_type, description, confidence,
                 timestamp, gps_lat, gps_lng, is_acknowledged, severity)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.camera_id)
        .bind(&event.camera_name)
        .bind(event.event_type.as_str())
        .bind(&event.description)
        .bind(event.confidence)
        .bind(event.timestamp)
        .bind(event.gps_lat)
        .bind(event.gps_lng)
        .bind(event.is_acknowledged)
        .bind(event.severity.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn camera(&self, camera_id: &str) -> Result<Option<CameraRecord>> {
        let row = sqlx::query(
            "SELECT id, name, location, source, gps_lat, gps_lng, fps FROM cameras WHERE id = ?",
        )
        .bind(camera_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CameraRecord {
            id: row.get("id"),
            name: row.get("name"),
            location: row.get("location"),
            source: row.get("source"),
            gps_lat: row.get("gps_lat"),
            gps_lng: row.get("gps_lng"),
            fps: row.get::<i64, _>("fps") as u32,
        }))
    }
}
