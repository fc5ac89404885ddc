//! Documents migration.
//!
//! Creates the document metadata table and the orphan blob ledger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS orphan_blobs CASCADE; DROP TABLE IF EXISTS documents CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const DOCUMENTS_SQL: &str = r"
-- Document metadata; the content lives in the blob store under object_key
CREATE TABLE documents (
    id BIGSERIAL PRIMARY KEY,
    title VARCHAR(200) NOT NULL,
    institution_name VARCHAR(100) NOT NULL,
    institution_type VARCHAR(50) NOT NULL,
    institution_url TEXT NOT NULL,
    document_type VARCHAR(100) NOT NULL,
    description VARCHAR(500),
    object_key VARCHAR(255) NOT NULL,
    retrieval_url TEXT NOT NULL,
    size_label VARCHAR(32) NOT NULL,
    uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_documents_object_key UNIQUE (object_key),
    CONSTRAINT chk_updated_after_upload CHECK (updated_at >= uploaded_at)
);

-- Filters used by the query endpoints
CREATE INDEX idx_documents_institution ON documents(institution_name, uploaded_at DESC);
CREATE INDEX idx_documents_type ON documents(document_type, uploaded_at DESC);
CREATE INDEX idx_documents_uploaded ON documents(uploaded_at DESC);

-- Blobs whose compensating remove failed; drained by the reconciliation sweep
CREATE TABLE orphan_blobs (
    object_key VARCHAR(255) PRIMARY KEY,
    reason TEXT NOT NULL,
    detected_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";
