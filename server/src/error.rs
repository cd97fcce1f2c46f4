//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Engine error: {0}")]
    Engine(#[from] collab_engine::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Provisioning task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use collab_engine::Error as EngineError;

        let (status, error_message, details) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Engine(e @ EngineError::DocumentAlreadyExists { .. }) => {
                tracing::warn!("Engine error: {:?}", e);
                (StatusCode::CONFLICT, e.to_string(), None)
            }
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            AppError::Backend(msg) => {
                tracing::error!("Backend error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Synchronization backend error".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Task(e) => {
                tracing::error!("Provisioning task failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, AppError>;
