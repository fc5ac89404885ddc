//! Docstore API Server
//!
//! Main entry point for the document storage service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docstore_api::{AppState, create_router};
use docstore_core::document::{DocumentService, DocumentServiceConfig};
use docstore_core::storage::{OpendalBlobStore, StorageConfig};
use docstore_db::{DocumentRepository, OrphanBlobRepository, connect_with};
use docstore_shared::{AppConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docstore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    // Blob store; the bucket itself is checked lazily on first upload
    let storage_config = StorageConfig::try_from(&config.storage)?;
    let blobs = OpendalBlobStore::from_config(storage_config)?;

    let service_config = DocumentServiceConfig::try_from(&config.storage)?;
    info!(
        max_file_size = service_config.max_file_size,
        retrieval_url_ttl_secs = service_config.retrieval_url_ttl.as_secs(),
        orphan_grace_period_secs = service_config.orphan_grace_period.as_secs(),
        "Document service configured"
    );

    let orphan_ledger = Arc::new(OrphanBlobRepository::new(db.clone()));
    let documents = DocumentService::new(
        Arc::new(DocumentRepository::new(db)),
        Arc::new(blobs),
        Arc::clone(&orphan_ledger),
        service_config,
    );

    // Create application state
    let state = AppState {
        documents: Arc::new(documents),
        orphan_ledger,
        jwt_service: Arc::new(JwtService::new(config.jwt.clone())),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
