//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::backend::AnyConnection;
use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Which synchronization backend documents are stored in
    pub backend: &'static str,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = match state.connection {
        AnyConnection::Memory(_) => "memory",
        AnyConnection::Postgres(_) => "postgres",
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend,
    })
}

/// Root handler.
async fn root() -> &'static str {
    "Collab Provisioning Server"
}
