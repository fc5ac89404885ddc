//! Blob reconciliation routes.
//!
//! Reports and removes blobs that no document row references, and clears
//! the matching orphan ledger entries.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use docstore_core::document::OrphanBlob;

/// Creates the maintenance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/maintenance/orphans", get(list_orphans))
        .route("/maintenance/orphans/sweep", post(sweep_orphans))
}

/// Response for `GET /maintenance/orphans`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReport {
    /// Blob keys with no document row, older than the grace period.
    pub unreferenced_keys: Vec<String>,
    /// Orphans recorded after a failed compensation.
    pub recorded: Vec<OrphanBlob>,
}

/// Response for `POST /maintenance/orphans/sweep`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Blob keys removed by this sweep.
    pub removed_keys: Vec<String>,
    /// Ledger entries cleared.
    pub ledger_entries_cleared: u64,
}

/// GET `/maintenance/orphans`
async fn list_orphans(State(state): State<AppState>) -> ApiResult<Json<OrphanReport>> {
    let unreferenced_keys = state.documents.find_orphan_blobs().await?;
    let recorded = state.orphan_ledger.list().await?;

    Ok(Json(OrphanReport {
        unreferenced_keys,
        recorded,
    }))
}

/// POST `/maintenance/orphans/sweep`
async fn sweep_orphans(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<SweepReport>> {
    let removed_keys = state.documents.sweep_orphan_blobs().await?;
    let ledger_entries_cleared = state.orphan_ledger.forget(&removed_keys).await?;

    info!(
        subject = %auth.subject(),
        removed = removed_keys.len(),
        ledger_entries_cleared,
        "Orphan sweep triggered via API"
    );

    Ok(Json(SweepReport {
        removed_keys,
        ledger_entries_cleared,
    }))
}
