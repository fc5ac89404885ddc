//! Coordinator tests against in-memory stores with failure injection.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::*;
use crate::storage::{BlobEntry, BlobStore, PresignedUrl, StorageError};

// ============================================================================
// In-memory metadata store
// ============================================================================

#[derive(Default)]
struct MockDocumentRepository {
    documents: Mutex<BTreeMap<DocumentId, Document>>,
    next_id: AtomicI64,
    fail_create: AtomicBool,
    create_delay_ms: AtomicU64,
    vanish_on_delete: AtomicBool,
    create_calls: AtomicUsize,
}

impl MockDocumentRepository {
    fn seed(&self, id: DocumentId, object_key: &str) -> Document {
        let at = Utc::now() - chrono::Duration::minutes(5);
        let document = Document {
            id,
            title: "Annual Statement".to_string(),
            institution_name: "First Bank".to_string(),
            institution_type: "bank".to_string(),
            institution_url: "https://firstbank.example".to_string(),
            document_type: "statement".to_string(),
            description: None,
            object_key: object_key.to_string(),
            retrieval_url: format!("https://blob.test/documents/{object_key}?stale"),
            size_label: "2.0 KB".to_string(),
            uploaded_at: at,
            updated_at: at,
        };
        self.documents
            .lock()
            .unwrap()
            .insert(id, document.clone());
        document
    }

    fn count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    fn filtered(&self, pred: impl Fn(&Document) -> bool) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| pred(d))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        docs
    }
}

impl DocumentRepository for MockDocumentRepository {
    async fn create(&self, input: NewDocument) -> Result<Document, DocumentError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DocumentError::persistence("connection reset"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let document = Document {
            id,
            title: input.fields.title,
            institution_name: input.fields.institution_name,
            institution_type: input.fields.institution_type,
            institution_url: input.fields.institution_url,
            document_type: input.fields.document_type,
            description: input.fields.description,
            object_key: input.object_key,
            retrieval_url: input.retrieval_url,
            size_label: input.size_label,
            uploaded_at: input.uploaded_at,
            updated_at: input.uploaded_at,
        };
        self.documents
            .lock()
            .unwrap()
            .insert(id, document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, DocumentError> {
        Ok(self.documents.lock().unwrap().get(&id).cloned())
    }

    async fn update_fields(
        &self,
        id: DocumentId,
        fields: DocumentFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Document>, DocumentError> {
        let mut documents = self.documents.lock().unwrap();
        let Some(document) = documents.get_mut(&id) else {
            return Ok(None);
        };
        document.title = fields.title;
        document.institution_name = fields.institution_name;
        document.institution_type = fields.institution_type;
        document.institution_url = fields.institution_url;
        document.document_type = fields.document_type;
        document.description = fields.description;
        document.updated_at = updated_at;
        Ok(Some(document.clone()))
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, DocumentError> {
        let removed = self.documents.lock().unwrap().remove(&id).is_some();
        if self.vanish_on_delete.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(removed)
    }

    async fn list_all(&self) -> Result<Vec<Document>, DocumentError> {
        Ok(self.filtered(|_| true))
    }

    async fn find_by_institution(
        &self,
        institution_name: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        Ok(self.filtered(|d| d.institution_name == institution_name))
    }

    async fn find_by_type(&self, document_type: &str) -> Result<Vec<Document>, DocumentError> {
        Ok(self.filtered(|d| d.document_type == document_type))
    }

    async fn find_by_institution_and_type(
        &self,
        institution_name: &str,
        document_type: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        Ok(self.filtered(|d| {
            d.institution_name == institution_name && d.document_type == document_type
        }))
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Document>, DocumentError> {
        let needle = fragment.to_lowercase();
        Ok(self.filtered(|d| d.title.to_lowercase().contains(&needle)))
    }

    async fn list_object_keys(&self) -> Result<Vec<String>, DocumentError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .map(|d| d.object_key.clone())
            .collect())
    }
}

// ============================================================================
// In-memory blob store
// ============================================================================

#[derive(Default)]
struct MockBlobStore {
    /// Key to last write time.
    objects: Mutex<HashMap<String, Option<DateTime<Utc>>>>,
    fail_bucket: AtomicBool,
    fail_put: AtomicBool,
    fail_presign: AtomicBool,
    fail_remove: AtomicBool,
    put_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

impl MockBlobStore {
    /// A blob written long before any test runs.
    fn insert(&self, key: &str) {
        self.insert_at(key, Some(Utc::now() - chrono::Duration::days(2)));
    }

    fn insert_at(&self, key: &str, last_modified: Option<DateTime<Utc>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), last_modified);
    }

    fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    fn count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

impl BlobStore for MockBlobStore {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        if self.fail_bucket.load(Ordering::SeqCst) {
            return Err(StorageError::operation("bucket unreachable"));
        }
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        size: u64,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::operation("connection refused"));
        }
        assert_eq!(content.len() as u64, size);
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Some(Utc::now()));
        Ok(())
    }

    async fn presign(&self, key: &str, expiry: Duration) -> Result<PresignedUrl, StorageError> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(StorageError::operation("signing failed"));
        }
        Ok(PresignedUrl {
            url: format!(
                "https://blob.test/documents/{key}?X-Amz-Expires={}",
                expiry.as_secs()
            ),
            method: "GET".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(60),
        })
    }

    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StorageError::operation("access denied"));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<BlobEntry>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, last_modified)| BlobEntry {
                key: key.clone(),
                last_modified: *last_modified,
            })
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.contains(key))
    }
}

// ============================================================================
// Orphan recorder
// ============================================================================

#[derive(Default)]
struct MockOrphanRecorder {
    recorded: Mutex<Vec<OrphanBlob>>,
}

impl OrphanRecorder for MockOrphanRecorder {
    async fn record(&self, orphan: OrphanBlob) -> Result<(), DocumentError> {
        self.recorded.lock().unwrap().push(orphan);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    repo: Arc<MockDocumentRepository>,
    blobs: Arc<MockBlobStore>,
    orphans: Arc<MockOrphanRecorder>,
    service: DocumentService<MockDocumentRepository, MockBlobStore, MockOrphanRecorder>,
}

fn harness() -> Harness {
    harness_with(DocumentServiceConfig::default())
}

fn harness_with(config: DocumentServiceConfig) -> Harness {
    let repo = Arc::new(MockDocumentRepository::default());
    let blobs = Arc::new(MockBlobStore::default());
    let orphans = Arc::new(MockOrphanRecorder::default());
    let service = DocumentService::new(
        Arc::clone(&repo),
        Arc::clone(&blobs),
        Arc::clone(&orphans),
        config,
    );
    Harness {
        repo,
        blobs,
        orphans,
        service,
    }
}

fn fields() -> DocumentFields {
    DocumentFields {
        title: "Quarterly Report".to_string(),
        institution_name: "First Bank".to_string(),
        institution_type: "bank".to_string(),
        institution_url: "https://firstbank.example".to_string(),
        document_type: "report".to_string(),
        description: Some("Q3 figures".to_string()),
    }
}

fn pdf_upload(len: usize) -> UploadInput {
    UploadInput::new(Bytes::from(vec![b'%'; len]), fields())
        .with_filename("report.pdf")
        .with_content_type("application/pdf")
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_pdf_stores_blob_and_metadata() {
    let h = harness();

    let document = h.service.upload_with_metadata(pdf_upload(2048)).await.unwrap();

    assert_eq!(document.size_label, "2.0 KB");
    assert!(document.object_key.ends_with(".pdf"));
    assert!(!document.retrieval_url.is_empty());
    assert!(document.retrieval_url.contains("X-Amz-Expires=86400"));
    assert_eq!(document.uploaded_at, document.updated_at);
    assert!(h.blobs.contains(&document.object_key));
    assert_eq!(h.repo.count(), 1);
}

#[tokio::test]
async fn test_upload_trims_fields_and_drops_blank_description() {
    let h = harness();
    let mut input = pdf_upload(16);
    input.fields.title = "  Quarterly Report  ".to_string();
    input.fields.description = Some("   ".to_string());

    let document = h.service.upload_with_metadata(input).await.unwrap();

    assert_eq!(document.title, "Quarterly Report");
    assert_eq!(document.description, None);
}

#[tokio::test]
async fn test_upload_empty_file_writes_nothing() {
    let h = harness();

    let err = h
        .service
        .upload_with_metadata(UploadInput::new(Bytes::new(), fields()))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Validation(_)));
    assert_eq!(h.blobs.put_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.repo.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_oversized_file_is_rejected() {
    let h = harness_with(DocumentServiceConfig::default().with_max_file_size(1024));

    let err = h
        .service
        .upload_with_metadata(pdf_upload(1025))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Validation(msg) if msg.contains("exceeds maximum")));
    assert_eq!(h.blobs.put_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_at_size_limit_is_accepted() {
    let h = harness_with(DocumentServiceConfig::default().with_max_file_size(1024));

    let document = h.service.upload_with_metadata(pdf_upload(1024)).await.unwrap();
    assert_eq!(document.size_label, "1.0 KB");
}

#[tokio::test]
async fn test_upload_declared_size_mismatch_is_rejected() {
    let h = harness();
    let mut input = pdf_upload(100);
    input.declared_size = 200;

    let err = h.service.upload_with_metadata(input).await.unwrap_err();

    assert!(matches!(err, DocumentError::Validation(_)));
    assert_eq!(h.blobs.put_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_invalid_fields_are_rejected() {
    let h = harness();
    let mut input = pdf_upload(10);
    input.fields.institution_url = "ftp://files.example".to_string();
    input.fields.title = "Q".to_string();

    let err = h.service.upload_with_metadata(input).await.unwrap_err();

    match err {
        DocumentError::Validation(msg) => {
            assert!(msg.contains("institution_url"));
            assert!(msg.contains("title"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(h.blobs.put_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_overlong_document_type_writes_nothing() {
    let h = harness();
    let mut input = pdf_upload(10);
    input.fields.document_type = "t".repeat(101);

    let err = h.service.upload_with_metadata(input).await.unwrap_err();

    assert!(matches!(err, DocumentError::Validation(msg) if msg.contains("document_type")));
    assert_eq!(h.blobs.put_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.repo.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_with_overlong_extension_gets_short_key() {
    let h = harness();
    let input = pdf_upload(10).with_filename(format!("a.{}", "x".repeat(300)));

    let document = h.service.upload_with_metadata(input).await.unwrap();

    assert_eq!(document.object_key.len(), 36);
    assert!(h.blobs.contains(&document.object_key));
}

#[tokio::test]
async fn test_upload_bucket_failure_writes_nothing() {
    let h = harness();
    h.blobs.fail_bucket.store(true, Ordering::SeqCst);

    let err = h.service.upload_with_metadata(pdf_upload(10)).await.unwrap_err();

    assert!(matches!(err, DocumentError::Storage(_)));
    assert_eq!(h.blobs.put_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.repo.count(), 0);
}

#[tokio::test]
async fn test_upload_put_failure_skips_metadata() {
    let h = harness();
    h.blobs.fail_put.store(true, Ordering::SeqCst);

    let err = h.service.upload_with_metadata(pdf_upload(10)).await.unwrap_err();

    assert!(matches!(err, DocumentError::Storage(_)));
    assert_eq!(h.repo.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.repo.count(), 0);
}

#[tokio::test]
async fn test_upload_presign_failure_removes_blob() {
    let h = harness();
    h.blobs.fail_presign.store(true, Ordering::SeqCst);

    let err = h.service.upload_with_metadata(pdf_upload(10)).await.unwrap_err();

    assert!(matches!(err, DocumentError::Storage(_)));
    assert_eq!(h.blobs.count(), 0);
    assert_eq!(h.repo.create_calls.load(Ordering::SeqCst), 0);
    assert!(h.orphans.recorded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_persist_failure_removes_blob() {
    let h = harness();
    h.repo.fail_create.store(true, Ordering::SeqCst);

    let err = h.service.upload_with_metadata(pdf_upload(10)).await.unwrap_err();

    assert!(matches!(err, DocumentError::Persistence(_)));
    assert_eq!(h.blobs.count(), 0);
    assert_eq!(h.blobs.remove_calls.load(Ordering::SeqCst), 1);
    assert!(h.orphans.recorded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_compensation_records_orphan() {
    let h = harness();
    h.repo.fail_create.store(true, Ordering::SeqCst);
    h.blobs.fail_remove.store(true, Ordering::SeqCst);

    let err = h.service.upload_with_metadata(pdf_upload(10)).await.unwrap_err();

    assert!(matches!(err, DocumentError::Persistence(_)));
    let recorded = h.orphans.recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert!(h.blobs.contains(&recorded[0].object_key));
    assert!(recorded[0].reason.contains("metadata persist failed"));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_removes_blob_and_row_then_reports_not_found() {
    let h = harness();
    h.blobs.insert("doc-7.pdf");
    h.repo.seed(7, "doc-7.pdf");

    h.service.delete_document(7).await.unwrap();

    assert!(!h.blobs.contains("doc-7.pdf"));
    assert!(h.repo.find_by_id(7).await.unwrap().is_none());

    let err = h.service.delete_document(7).await.unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(7)));

    // The key is gone; removing it again is still fine.
    h.blobs.remove_object("doc-7.pdf").await.unwrap();
}

#[tokio::test]
async fn test_delete_row_even_when_blob_removal_fails() {
    let h = harness();
    h.blobs.insert("doc-9.pdf");
    h.repo.seed(9, "doc-9.pdf");
    h.blobs.fail_remove.store(true, Ordering::SeqCst);

    h.service.delete_document(9).await.unwrap();

    assert_eq!(h.repo.count(), 0);
    assert!(h.blobs.contains("doc-9.pdf"));
}

#[tokio::test]
async fn test_delete_with_missing_blob_succeeds() {
    let h = harness();
    h.repo.seed(4, "never-uploaded.pdf");

    h.service.delete_document(4).await.unwrap();
    assert_eq!(h.repo.count(), 0);
}

#[tokio::test]
async fn test_delete_concurrently_vanished_row_is_not_found() {
    let h = harness();
    h.repo.seed(5, "doc-5.pdf");
    h.repo.vanish_on_delete.store(true, Ordering::SeqCst);

    let err = h.service.delete_document(5).await.unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(5)));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_title_keeps_blob_attributes() {
    let h = harness();
    let before = h.repo.seed(3, "doc-3.pdf");

    let mut changed = before.fields();
    changed.title = "Annual Statement 2026".to_string();
    let after = h.service.update_document(3, changed).await.unwrap();

    assert_eq!(after.title, "Annual Statement 2026");
    assert_eq!(after.object_key, before.object_key);
    assert_eq!(after.retrieval_url, before.retrieval_url);
    assert_eq!(after.size_label, before.size_label);
    assert_eq!(after.uploaded_at, before.uploaded_at);
    assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn test_repeated_updates_strictly_advance_updated_at() {
    let h = harness();
    let seeded = h.repo.seed(3, "doc-3.pdf");

    let first = h.service.update_document(3, seeded.fields()).await.unwrap();
    let second = h.service.update_document(3, seeded.fields()).await.unwrap();

    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_update_missing_document_is_not_found() {
    let h = harness();

    let err = h.service.update_document(404, fields()).await.unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(404)));
}

#[tokio::test]
async fn test_update_rejects_invalid_fields() {
    let h = harness();
    let seeded = h.repo.seed(3, "doc-3.pdf");

    let mut changed = seeded.fields();
    changed.document_type = "  ".to_string();
    let err = h.service.update_document(3, changed).await.unwrap_err();

    assert!(matches!(err, DocumentError::Validation(_)));
    let stored = h.repo.find_by_id(3).await.unwrap().unwrap();
    assert_eq!(stored, seeded);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_refresh_retrieval_url_uses_object_key() {
    let h = harness();
    h.repo.seed(1, "doc-1.pdf");

    let presigned = h.service.refresh_retrieval_url(1).await.unwrap();

    assert!(presigned.url.contains("doc-1.pdf"));
    assert_eq!(presigned.method, "GET");
}

#[tokio::test]
async fn test_refresh_retrieval_url_propagates_presign_failure() {
    let h = harness();
    h.repo.seed(1, "doc-1.pdf");
    h.blobs.fail_presign.store(true, Ordering::SeqCst);

    let err = h.service.refresh_retrieval_url(1).await.unwrap_err();
    assert!(matches!(err, DocumentError::Storage(_)));
}

#[tokio::test]
async fn test_get_document_regenerates_url_without_persisting() {
    let h = harness();
    let seeded = h.repo.seed(2, "doc-2.pdf");

    let document = h.service.get_document(2).await.unwrap();

    assert_ne!(document.retrieval_url, seeded.retrieval_url);
    assert!(document.retrieval_url.contains("X-Amz-Expires"));
    let stored = h.repo.find_by_id(2).await.unwrap().unwrap();
    assert_eq!(stored.retrieval_url, seeded.retrieval_url);
}

#[tokio::test]
async fn test_list_falls_back_to_stored_url_when_presign_fails() {
    let h = harness();
    let seeded = h.repo.seed(2, "doc-2.pdf");
    h.blobs.fail_presign.store(true, Ordering::SeqCst);

    let documents = h.service.list_documents().await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].retrieval_url, seeded.retrieval_url);
}

#[tokio::test]
async fn test_filters_by_institution_and_type() {
    let h = harness();
    h.service.upload_with_metadata(pdf_upload(10)).await.unwrap();

    let mut other = pdf_upload(10);
    other.fields.institution_name = "State University".to_string();
    other.fields.document_type = "transcript".to_string();
    h.service.upload_with_metadata(other).await.unwrap();

    assert_eq!(h.service.find_by_institution("First Bank").await.unwrap().len(), 1);
    assert_eq!(h.service.find_by_type("transcript").await.unwrap().len(), 1);
    assert_eq!(
        h.service
            .find_by_institution_and_type("State University", "report")
            .await
            .unwrap()
            .len(),
        0
    );
    assert_eq!(h.service.list_documents().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_by_title_is_case_insensitive() {
    let h = harness();
    h.service.upload_with_metadata(pdf_upload(10)).await.unwrap();

    let found = h.service.search_by_title("  quarterly ").await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_search_by_title_rejects_short_fragment() {
    let h = harness();

    let err = h.service.search_by_title(" q ").await.unwrap_err();
    assert!(matches!(err, DocumentError::Validation(_)));
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_sweep_removes_only_unreferenced_blobs() {
    let h = harness();
    let kept = h.service.upload_with_metadata(pdf_upload(10)).await.unwrap();
    h.blobs.insert("stray-a.pdf");
    h.blobs.insert("stray-b.docx");

    let orphans = h.service.find_orphan_blobs().await.unwrap();
    assert_eq!(orphans, vec!["stray-a.pdf".to_string(), "stray-b.docx".to_string()]);

    let removed = h.service.sweep_orphan_blobs().await.unwrap();
    assert_eq!(removed, orphans);
    assert!(h.blobs.contains(&kept.object_key));
    assert_eq!(h.blobs.count(), 1);
}

#[tokio::test]
async fn test_sweep_spares_upload_still_persisting() {
    let h = harness();
    h.repo.create_delay_ms.store(100, Ordering::SeqCst);
    h.blobs.insert("stray.pdf");

    let sweep = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.service.sweep_orphan_blobs().await
    };
    let (uploaded, swept) = tokio::join!(h.service.upload_with_metadata(pdf_upload(2048)), sweep);

    let document = uploaded.unwrap();
    assert_eq!(swept.unwrap(), vec!["stray.pdf".to_string()]);
    assert!(h.blobs.contains(&document.object_key));
    assert_eq!(
        h.repo.list_object_keys().await.unwrap(),
        vec![document.object_key]
    );
}

#[tokio::test]
async fn test_orphans_respect_grace_period() {
    let h = harness_with(
        DocumentServiceConfig::default().with_orphan_grace_period(Duration::from_secs(600)),
    );
    h.blobs.insert_at("fresh.pdf", Some(Utc::now() - chrono::Duration::minutes(1)));
    h.blobs.insert_at("aged.pdf", Some(Utc::now() - chrono::Duration::minutes(11)));
    h.blobs.insert_at("undated.pdf", None);

    let orphans = h.service.find_orphan_blobs().await.unwrap();
    assert_eq!(orphans, vec!["aged.pdf".to_string()]);

    h.service.sweep_orphan_blobs().await.unwrap();
    assert!(h.blobs.contains("fresh.pdf"));
    assert!(h.blobs.contains("undated.pdf"));
    assert!(!h.blobs.contains("aged.pdf"));
}

#[tokio::test]
async fn test_sweep_skips_keys_that_fail_to_remove() {
    let h = harness();
    h.blobs.insert("stray.pdf");
    h.blobs.fail_remove.store(true, Ordering::SeqCst);

    let removed = h.service.sweep_orphan_blobs().await.unwrap();

    assert!(removed.is_empty());
    assert!(h.blobs.contains("stray.pdf"));
}

#[tokio::test]
async fn test_log_orphan_recorder_accepts_orphans() {
    let recorder = LogOrphanRecorder;
    recorder
        .record(OrphanBlob::new("lost.pdf", "metadata persist failed"))
        .await
        .unwrap();
}
