//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;

use crate::camera_registry::{StartOutcome, StopOutcome};
use crate::error::{Error, Result};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/system/status", get(system_status))
        // Camera lifecycle
        .route("/api/cameras/:id/start", post(start_camera))
        .route("/api/cameras/:id/stop", post(stop_camera))
        // WebSocket
        .route("/api/ws", get(websocket_handler))
        .with_state(state)
}

/// System status endpoint
async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.system_health.read().await;

    Json(json!({
        "active_cameras": state.registry.len().await,
        "running_camera_ids": state.registry.list().await,
        "connected_clients": state.hub.connection_count(),
        "cpu_percent": health.cpu_percent,
        "memory_percent": health.memory_percent,
        "overloaded": health.overloaded,
    }))
}

/// Start a camera unit
/// POST /api/cameras/:id/start
async fn start_camera(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<impl IntoResponse> {
    let record = state
        .store
        .camera(&camera_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Camera not found: {}", camera_id)))?;

    let response = match state.registry.start(&record).await {
        StartOutcome::Started { mock } => json!({
            "message": "Camera started successfully",
            "status": "started",
            "mock_mode": mock,
            "camera_name": record.name,
        }),
        StartOutcome::AlreadyRunning { mock } => json!({
            "message": "Camera already running",
            "status": "already_running",
            "mock_mode": mock,
            "camera_name": record.name,
        }),
    };

    Ok(Json(response))
}

/// Stop a camera unit
/// POST /api/cameras/:id/stop
async fn stop_camera(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> impl IntoResponse {
    let response = match state.registry.stop(&camera_id).await {
        StopOutcome::Stopped => json!({
            "message": "Camera stopped successfully",
            "status": "stopped",
        }),
        StopOutcome::NotRunning => json!({
            "message": "Camera not running",
            "status": "not_running",
        }),
    };

    Json(response)
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle one observer connection.
///
/// The hub queues messages into an unbounded channel per observer; this
/// handler forwards them to the socket. A socket write error ends the
/// forward task, which drops the receiver, which makes the hub prune the
/// channel on its next broadcast.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut rx) = state.hub.register().await;

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Watch the incoming side for close/errors
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %conn_id, "Observer closed connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
        conn_id
    });

    let conn_id = tokio::select! {
        _ = send_task => conn_id,
        result = recv_task => result.unwrap_or(conn_id),
    };

    state.hub.unregister(&conn_id).await;
}
