//! Collab Server - provisioning for collaborative documents.
//!
//! Exposes the [`DocumentProvisioner`] over HTTP and ships two
//! synchronization backends: an in-memory service and a PostgreSQL service.

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod provisioner;
pub mod routes;

pub use provisioner::{DocumentProvisioner, Pending, ProvisionOutcome, Provisioning, RemoveOutcome};

use crate::backend::AnyConnection;
use crate::config::Config;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub connection: AnyConnection,
    pub config: Arc<Config>,
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
