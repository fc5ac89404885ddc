//! Orphan blob ledger.
//!
//! Persists blob keys whose compensating remove failed, so the
//! reconciliation sweep can report and clear them.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{error, warn};

use crate::entities::orphan_blobs;
use docstore_core::document::{DocumentError, OrphanBlob, OrphanRecorder};

/// Orphan blob repository implementation.
#[derive(Debug, Clone)]
pub struct OrphanBlobRepository {
    db: DatabaseConnection,
}

impl OrphanBlobRepository {
    /// Create a new orphan blob repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All recorded orphans, oldest first.
    pub async fn list(&self) -> Result<Vec<OrphanBlob>, DocumentError> {
        let models = orphan_blobs::Entity::find()
            .order_by_asc(orphan_blobs::Column::DetectedAt)
            .all(&self.db)
            .await
            .map_err(persistence)?;

        Ok(models
            .into_iter()
            .map(|m| OrphanBlob {
                object_key: m.object_key,
                reason: m.reason,
                detected_at: m.detected_at.with_timezone(&Utc),
            })
            .collect())
    }

    /// Drop ledger entries for keys the sweep has removed.
    pub async fn forget(&self, object_keys: &[String]) -> Result<u64, DocumentError> {
        if object_keys.is_empty() {
            return Ok(0);
        }

        let result = orphan_blobs::Entity::delete_many()
            .filter(orphan_blobs::Column::ObjectKey.is_in(object_keys.iter().cloned()))
            .exec(&self.db)
            .await
            .map_err(persistence)?;

        Ok(result.rows_affected)
    }
}

impl OrphanRecorder for OrphanBlobRepository {
    async fn record(&self, orphan: OrphanBlob) -> Result<(), DocumentError> {
        warn!(object_key = %orphan.object_key, reason = %orphan.reason, "Recording orphaned blob");

        let active_model = orphan_blobs::ActiveModel {
            object_key: Set(orphan.object_key.clone()),
            reason: Set(orphan.reason.clone()),
            detected_at: Set(orphan.detected_at.into()),
        };

        let result = orphan_blobs::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(orphan_blobs::Column::ObjectKey)
                    .update_columns([
                        orphan_blobs::Column::Reason,
                        orphan_blobs::Column::DetectedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        if let Err(e) = result {
            // The ledger shares the metadata database; keep a trace if it is down too.
            error!(
                target: "docstore::orphans",
                object_key = %orphan.object_key,
                reason = %orphan.reason,
                error = %e,
                "Orphaned blob could not be written to the ledger"
            );
            return Err(persistence(e));
        }

        Ok(())
    }
}

fn persistence(err: DbErr) -> DocumentError {
    DocumentError::persistence(err.to_string())
}
