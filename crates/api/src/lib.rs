//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for documents
//! - Authentication middleware
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use docstore_core::document::DocumentService;
use docstore_core::storage::OpendalBlobStore;
use docstore_db::{DocumentRepository, OrphanBlobRepository};
use docstore_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart framing and text fields on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// The coordinator as wired in production.
pub type AppDocumentService =
    DocumentService<DocumentRepository, OpendalBlobStore, OrphanBlobRepository>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Document storage coordinator.
    pub documents: Arc<AppDocumentService>,
    /// Orphan blob ledger, cleared by the reconciliation sweep.
    pub orphan_ledger: Arc<OrphanBlobRepository>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    /// Largest request body accepted by the upload route.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        let limit = self
            .documents
            .config()
            .max_file_size
            .saturating_add(MULTIPART_OVERHEAD);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(DefaultBodyLimit::max(state.body_limit()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
