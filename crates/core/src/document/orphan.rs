//! Blobs left behind by a failed compensation.
//!
//! The coordinator cannot roll back a blob write atomically with a metadata
//! write. When the compensating remove fails too, the key is handed to an
//! [`OrphanRecorder`] so a later sweep can reclaim it.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::DocumentError;

/// A blob with no metadata row referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanBlob {
    /// Blob store key.
    pub object_key: String,
    /// Why the blob was orphaned.
    pub reason: String,
    /// When the orphan was detected.
    pub detected_at: DateTime<Utc>,
}

impl OrphanBlob {
    /// Create an orphan detected now.
    #[must_use]
    pub fn new(object_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            object_key: object_key.into(),
            reason: reason.into(),
            detected_at: Utc::now(),
        }
    }
}

/// Sink for orphaned blob keys.
///
/// Kept separate from [`DocumentRepository`](super::DocumentRepository): the
/// metadata store may be the component that just failed.
pub trait OrphanRecorder: Send + Sync {
    /// Record one orphan. Recording the same key twice must not fail.
    fn record(
        &self,
        orphan: OrphanBlob,
    ) -> impl Future<Output = Result<(), DocumentError>> + Send;
}

/// Records orphans as `error` events on the `docstore::orphans` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOrphanRecorder;

impl OrphanRecorder for LogOrphanRecorder {
    async fn record(&self, orphan: OrphanBlob) -> Result<(), DocumentError> {
        error!(
            target: "docstore::orphans",
            object_key = %orphan.object_key,
            reason = %orphan.reason,
            detected_at = %orphan.detected_at,
            "Orphaned blob requires reconciliation"
        );
        Ok(())
    }
}
