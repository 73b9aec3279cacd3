//! WebAPI - Control Surface
//!
//! ## Responsibilities
//!
//! - Health and system-status endpoints
//! - Camera start/stop (the only outside mutation entry points)
//! - WebSocket observer channel

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_cameras: state.registry.len().await,
        connected_clients: state.hub.connection_count(),
        db_connected: !state.pool.is_closed(),
    };

    Json(response)
}
