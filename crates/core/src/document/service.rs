//! Document storage coordinator.
//!
//! Sequences blob store writes, presigned URL issuance, and metadata
//! persistence. The two stores share no transaction, so every step that can
//! leave a blob without a row is followed by a compensating remove.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docstore_shared::StorageSettings;
use tracing::{debug, error, info, warn};
use validator::Validate;

use super::error::DocumentError;
use super::orphan::{LogOrphanRecorder, OrphanBlob, OrphanRecorder};
use super::types::{Document, DocumentFields, DocumentId, NewDocument, UploadInput};
use crate::storage::{BlobStore, PresignedUrl, StorageError, format_size, generate_object_key};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Minimum length of a title search fragment.
pub const MIN_SEARCH_LEN: usize = 2;

/// Repository trait for document metadata persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
/// List operations return newest uploads first.
pub trait DocumentRepository: Send + Sync {
    /// Insert a new document row and return it with its assigned ID.
    fn create(
        &self,
        input: NewDocument,
    ) -> impl Future<Output = Result<Document, DocumentError>> + Send;

    /// Find document by ID.
    fn find_by_id(
        &self,
        id: DocumentId,
    ) -> impl Future<Output = Result<Option<Document>, DocumentError>> + Send;

    /// Overwrite the editable fields and `updated_at`. Returns `None` if the
    /// row no longer exists.
    fn update_fields(
        &self,
        id: DocumentId,
        fields: DocumentFields,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Document>, DocumentError>> + Send;

    /// Delete document by ID. Returns whether a row was removed.
    fn delete(&self, id: DocumentId) -> impl Future<Output = Result<bool, DocumentError>> + Send;

    /// All documents.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents issued by an institution (exact match).
    fn find_by_institution(
        &self,
        institution_name: &str,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents of one type (exact match).
    fn find_by_type(
        &self,
        document_type: &str,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents matching both institution and type.
    fn find_by_institution_and_type(
        &self,
        institution_name: &str,
        document_type: &str,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents whose title contains `fragment`, ignoring case.
    fn search_by_title(
        &self,
        fragment: &str,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Every object key referenced by a row.
    fn list_object_keys(&self) -> impl Future<Output = Result<Vec<String>, DocumentError>> + Send;
}

/// Coordinator limits.
#[derive(Debug, Clone)]
pub struct DocumentServiceConfig {
    /// Largest accepted upload in bytes.
    pub max_file_size: u64,
    /// Lifetime of issued retrieval URLs.
    pub retrieval_url_ttl: Duration,
    /// Unreferenced blobs younger than this are never swept.
    pub orphan_grace_period: Duration,
}

impl DocumentServiceConfig {
    /// Default maximum file size: 10 MiB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default retrieval URL lifetime: 24 hours.
    pub const DEFAULT_RETRIEVAL_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    /// Longest retrieval URL lifetime: 7 days, the S3 presign ceiling.
    pub const MAX_RETRIEVAL_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    /// Default orphan grace period: 1 hour.
    pub const DEFAULT_ORPHAN_GRACE_PERIOD: Duration = Duration::from_secs(60 * 60);

    /// Set the maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the retrieval URL lifetime.
    #[must_use]
    pub fn with_retrieval_url_ttl(mut self, ttl: Duration) -> Self {
        self.retrieval_url_ttl = ttl;
        self
    }

    /// Set the orphan grace period.
    #[must_use]
    pub fn with_orphan_grace_period(mut self, grace: Duration) -> Self {
        self.orphan_grace_period = grace;
        self
    }
}

impl Default for DocumentServiceConfig {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            retrieval_url_ttl: Self::DEFAULT_RETRIEVAL_URL_TTL,
            orphan_grace_period: Self::DEFAULT_ORPHAN_GRACE_PERIOD,
        }
    }
}

impl TryFrom<&StorageSettings> for DocumentServiceConfig {
    type Error = StorageError;

    fn try_from(settings: &StorageSettings) -> Result<Self, Self::Error> {
        let retrieval_url_ttl = Duration::from_secs(settings.retrieval_url_ttl_secs);
        if retrieval_url_ttl.is_zero() || retrieval_url_ttl > Self::MAX_RETRIEVAL_URL_TTL {
            return Err(StorageError::configuration(format!(
                "retrieval_url_ttl_secs must be between 1 and {}",
                Self::MAX_RETRIEVAL_URL_TTL.as_secs()
            )));
        }

        Ok(Self {
            max_file_size: settings.max_file_size,
            retrieval_url_ttl,
            orphan_grace_period: Duration::from_secs(settings.orphan_grace_period_secs),
        })
    }
}

/// Document service coordinating the blob store and the metadata store.
pub struct DocumentService<R, B, O = LogOrphanRecorder> {
    repo: Arc<R>,
    blobs: Arc<B>,
    orphans: Arc<O>,
    config: DocumentServiceConfig,
}

impl<R, B, O> Clone for DocumentService<R, B, O> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            blobs: Arc::clone(&self.blobs),
            orphans: Arc::clone(&self.orphans),
            config: self.config.clone(),
        }
    }
}

impl<R, B, O> DocumentService<R, B, O>
where
    R: DocumentRepository,
    B: BlobStore,
    O: OrphanRecorder,
{
    /// Create a new document service.
    #[must_use]
    pub fn new(
        repo: Arc<R>,
        blobs: Arc<B>,
        orphans: Arc<O>,
        config: DocumentServiceConfig,
    ) -> Self {
        Self {
            repo,
            blobs,
            orphans,
            config,
        }
    }

    /// Get the coordinator limits.
    #[must_use]
    pub fn config(&self) -> &DocumentServiceConfig {
        &self.config
    }

    /// Get the blob store.
    #[must_use]
    pub fn blob_store(&self) -> &B {
        &self.blobs
    }

    /// Store file content and persist its metadata.
    ///
    /// Steps run in order: validate, ensure bucket, generate key, put,
    /// presign, persist. A failure after the put removes the blob again; if
    /// that remove fails too, the key is handed to the orphan recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is empty, oversized, or its length differs from the declared size
    /// - A metadata field is invalid
    /// - The blob store rejects the bucket check, the write, or the presign
    /// - The metadata store fails to persist the row
    pub async fn upload_with_metadata(
        &self,
        input: UploadInput,
    ) -> Result<Document, DocumentError> {
        let fields = self.validate_upload(&input)?;

        self.blobs.ensure_bucket().await?;

        let object_key = generate_object_key(input.filename.as_deref());
        let content_type = input.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);

        self.blobs
            .put_object(&object_key, input.content, input.declared_size, content_type)
            .await
            .inspect_err(|e| error!(object_key = %object_key, error = %e, "Blob upload failed"))?;

        debug!(object_key = %object_key, size = input.declared_size, "Blob stored");

        let presigned = match self
            .blobs
            .presign(&object_key, self.config.retrieval_url_ttl)
            .await
        {
            Ok(presigned) => presigned,
            Err(e) => {
                error!(object_key = %object_key, error = %e, "Presign after upload failed");
                self.compensate(&object_key, &format!("presign failed: {e}"))
                    .await;
                return Err(e.into());
            }
        };

        let new_document = NewDocument {
            fields,
            object_key: object_key.clone(),
            retrieval_url: presigned.url,
            size_label: format_size(input.declared_size),
            uploaded_at: Utc::now(),
        };

        match self.repo.create(new_document).await {
            Ok(document) => {
                info!(
                    document_id = %document.id,
                    object_key = %document.object_key,
                    size_label = %document.size_label,
                    "Document uploaded"
                );
                Ok(document)
            }
            Err(e) => {
                error!(object_key = %object_key, error = %e, "Persisting document metadata failed");
                self.compensate(&object_key, &format!("metadata persist failed: {e}"))
                    .await;
                Err(match e {
                    DocumentError::Persistence(_) => e,
                    other => DocumentError::persistence(other.to_string()),
                })
            }
        }
    }

    /// Delete a document's blob and metadata row.
    ///
    /// The blob goes first. A blob removal failure is logged and the row is
    /// still deleted; a repeated delete then reports `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No document has this ID (including a concurrent delete)
    /// - The metadata store fails
    pub async fn delete_document(&self, id: DocumentId) -> Result<(), DocumentError> {
        let document = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DocumentError::not_found(id))?;

        if let Err(e) = self.blobs.remove_object(&document.object_key).await {
            warn!(
                document_id = %id,
                object_key = %document.object_key,
                error = %e,
                "Blob removal failed, deleting metadata anyway"
            );
        }

        if !self.repo.delete(id).await? {
            return Err(DocumentError::not_found(id));
        }

        info!(document_id = %id, object_key = %document.object_key, "Document deleted");
        Ok(())
    }

    /// Replace a document's editable fields.
    ///
    /// `object_key`, `retrieval_url`, `size_label` and `uploaded_at` are never
    /// touched. `updated_at` always moves strictly forward.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is invalid, the document does not exist,
    /// or the metadata store fails.
    pub async fn update_document(
        &self,
        id: DocumentId,
        fields: DocumentFields,
    ) -> Result<Document, DocumentError> {
        let fields = fields.normalized();
        fields.validate()?;

        let existing = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DocumentError::not_found(id))?;

        let updated_at = next_updated_at(existing.updated_at);

        let updated = self
            .repo
            .update_fields(id, fields, updated_at)
            .await?
            .ok_or_else(|| DocumentError::not_found(id))?;

        info!(document_id = %id, "Document metadata updated");
        Ok(updated)
    }

    /// Issue a fresh retrieval URL for a document.
    ///
    /// The new URL is returned, not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not exist or presigning fails.
    pub async fn refresh_retrieval_url(
        &self,
        id: DocumentId,
    ) -> Result<PresignedUrl, DocumentError> {
        let document = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DocumentError::not_found(id))?;

        let presigned = self
            .blobs
            .presign(&document.object_key, self.config.retrieval_url_ttl)
            .await?;

        debug!(document_id = %id, expires_at = %presigned.expires_at, "Retrieval URL refreshed");
        Ok(presigned)
    }

    /// Get a document with a freshly issued retrieval URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not exist or the metadata store fails.
    pub async fn get_document(&self, id: DocumentId) -> Result<Document, DocumentError> {
        let document = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DocumentError::not_found(id))?;

        Ok(self.with_fresh_url(document).await)
    }

    /// List every document.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata store fails.
    pub async fn list_documents(&self) -> Result<Vec<Document>, DocumentError> {
        let documents = self.repo.list_all().await?;
        Ok(self.with_fresh_urls(documents).await)
    }

    /// List documents issued by an institution.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata store fails.
    pub async fn find_by_institution(
        &self,
        institution_name: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        let documents = self.repo.find_by_institution(institution_name.trim()).await?;
        Ok(self.with_fresh_urls(documents).await)
    }

    /// List documents of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata store fails.
    pub async fn find_by_type(&self, document_type: &str) -> Result<Vec<Document>, DocumentError> {
        let documents = self.repo.find_by_type(document_type.trim()).await?;
        Ok(self.with_fresh_urls(documents).await)
    }

    /// List documents matching both institution and type.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata store fails.
    pub async fn find_by_institution_and_type(
        &self,
        institution_name: &str,
        document_type: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        let documents = self
            .repo
            .find_by_institution_and_type(institution_name.trim(), document_type.trim())
            .await?;
        Ok(self.with_fresh_urls(documents).await)
    }

    /// Case-insensitive title substring search.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is shorter than [`MIN_SEARCH_LEN`]
    /// characters or the metadata store fails.
    pub async fn search_by_title(&self, fragment: &str) -> Result<Vec<Document>, DocumentError> {
        let fragment = fragment.trim();
        if fragment.chars().count() < MIN_SEARCH_LEN {
            return Err(DocumentError::validation(format!(
                "search term must be at least {MIN_SEARCH_LEN} characters"
            )));
        }

        let documents = self.repo.search_by_title(fragment).await?;
        Ok(self.with_fresh_urls(documents).await)
    }

    /// Keys present in the blob store that no metadata row references and
    /// that were last written before the orphan grace period.
    ///
    /// An upload holds an unreferenced blob between its put and its row
    /// insert, so young blobs and blobs without a reported write time are
    /// never candidates. Blobs are listed before rows; a row committed in
    /// between still protects its blob.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be listed.
    pub async fn find_orphan_blobs(&self) -> Result<Vec<String>, DocumentError> {
        let objects = self.blobs.list_objects().await?;
        let referenced: HashSet<String> = self.repo.list_object_keys().await?.into_iter().collect();

        let Some(cutoff) = chrono::Duration::from_std(self.config.orphan_grace_period)
            .ok()
            .and_then(|grace| Utc::now().checked_sub_signed(grace))
        else {
            return Ok(Vec::new());
        };

        let mut orphans: Vec<String> = objects
            .into_iter()
            .filter(|object| !referenced.contains(&object.key))
            .filter(|object| match object.last_modified {
                Some(written) => written <= cutoff,
                None => {
                    debug!(object_key = %object.key, "Skipping blob without write time");
                    false
                }
            })
            .map(|object| object.key)
            .collect();
        orphans.sort();

        Ok(orphans)
    }

    /// Remove every unreferenced blob past the grace period and return the
    /// keys removed.
    ///
    /// Keys that fail to remove are logged and left for the next sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be listed.
    pub async fn sweep_orphan_blobs(&self) -> Result<Vec<String>, DocumentError> {
        let candidates = self.find_orphan_blobs().await?;
        let mut removed = Vec::with_capacity(candidates.len());

        for key in candidates {
            match self.blobs.remove_object(&key).await {
                Ok(()) => removed.push(key),
                Err(e) => warn!(object_key = %key, error = %e, "Orphan removal failed"),
            }
        }

        info!(removed = removed.len(), "Orphan sweep finished");
        Ok(removed)
    }

    fn validate_upload(&self, input: &UploadInput) -> Result<DocumentFields, DocumentError> {
        if input.declared_size == 0 || input.content.is_empty() {
            return Err(DocumentError::validation("file is empty"));
        }

        if input.declared_size > self.config.max_file_size {
            return Err(DocumentError::validation(
                StorageError::file_too_large(input.declared_size, self.config.max_file_size)
                    .to_string(),
            ));
        }

        let actual = input.content.len() as u64;
        if actual != input.declared_size {
            return Err(DocumentError::validation(
                StorageError::size_mismatch(input.declared_size, actual).to_string(),
            ));
        }

        let fields = input.fields.clone().normalized();
        fields.validate()?;
        Ok(fields)
    }

    async fn with_fresh_url(&self, mut document: Document) -> Document {
        match self
            .blobs
            .presign(&document.object_key, self.config.retrieval_url_ttl)
            .await
        {
            Ok(presigned) => document.retrieval_url = presigned.url,
            Err(e) => warn!(
                document_id = %document.id,
                object_key = %document.object_key,
                error = %e,
                "Presign failed, returning stored retrieval URL"
            ),
        }
        document
    }

    async fn with_fresh_urls(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut refreshed = Vec::with_capacity(documents.len());
        for document in documents {
            refreshed.push(self.with_fresh_url(document).await);
        }
        refreshed
    }

    /// Remove a blob written by a failed upload.
    async fn compensate(&self, object_key: &str, reason: &str) {
        match self.blobs.remove_object(object_key).await {
            Ok(()) => {
                info!(object_key = %object_key, "Compensating blob removal succeeded");
            }
            Err(e) => {
                error!(
                    object_key = %object_key,
                    error = %e,
                    "Compensating blob removal failed, recording orphan"
                );
                let orphan = OrphanBlob::new(object_key, format!("{reason}; remove failed: {e}"));
                if let Err(record_err) = self.orphans.record(orphan).await {
                    error!(
                        object_key = %object_key,
                        error = %record_err,
                        "Recording orphan failed"
                    );
                }
            }
        }
    }
}

/// The next `updated_at`: now, or one microsecond past the previous value
/// if the clock has not moved beyond it.
fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + chrono::Duration::microseconds(1);
    Utc::now().max(floor)
}
