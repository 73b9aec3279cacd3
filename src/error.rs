//! Error handling for the camserver
//!
//! Per-stage policy: `SourceUnavailable` is recovered locally by permanent
//! fallback to the synthetic feed, `Encode` skips one camera for one tick,
//! `Delivery` removes one observer, `Database` on an event write is logged
//! and swallowed. None of these is fatal to the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Physical capture open/read failure
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Frame encoding failure
    #[error("Encode failure: {0}")]
    Encode(String),

    /// Observer write failure
    #[error("Delivery failure: {0}")]
    Delivery(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLx database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::SourceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SOURCE_UNAVAILABLE",
                msg.clone(),
            ),
            Error::Encode(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENCODE_FAILURE",
                msg.clone(),
            ),
            Error::Delivery(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DELIVERY_FAILURE",
                msg.clone(),
            ),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Error::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                e.to_string(),
            ),
            Error::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                e.to_string(),
            ),
            Error::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                e.to_string(),
            ),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
