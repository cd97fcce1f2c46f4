//! Collab Server - provisioning server for collaborative documents.
//!
//! Serves document creation, reading and removal over HTTP on top of either a
//! PostgreSQL or an in-memory synchronization backend.

use collab_server::backend::{AnyConnection, MemoryService, PgService, SyncService};
use collab_server::config::Config;
use collab_server::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collab_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Collab Server on {}:{}", config.host, config.port);

    // Connect to the synchronization backend
    let connection = match &config.database_url {
        Some(url) => {
            let service = PgService::new(url.clone(), config.max_connections);
            AnyConnection::Postgres(service.connect().await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory");
            AnyConnection::Memory(MemoryService::new().connect().await?)
        }
    };

    let state = AppState {
        connection,
        config: Arc::new(config.clone()),
    };

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, collab_server::app(state)).await?;

    Ok(())
}
