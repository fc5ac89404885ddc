//! Document types and data structures.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Store-assigned document identifier.
pub type DocumentId = i64;

/// The editable metadata of a document.
///
/// Shared by upload and update; everything else on [`Document`] is derived
/// by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    /// Document title.
    #[validate(length(min = 2, max = 200))]
    pub title: String,
    /// Issuing institution.
    #[validate(length(min = 2, max = 100))]
    pub institution_name: String,
    /// Kind of institution (bank, university, agency...).
    #[validate(length(min = 2, max = 50))]
    pub institution_type: String,
    /// Institution website.
    #[validate(url, custom(function = "validate_http_scheme"))]
    pub institution_url: String,
    /// Document classification.
    #[validate(length(max = 100), custom(function = "validate_not_blank"))]
    pub document_type: String,
    /// Free-form description.
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl DocumentFields {
    /// Trim every field; a blank description becomes `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            institution_name: self.institution_name.trim().to_string(),
            institution_type: self.institution_type.trim().to_string(),
            institution_url: self.institution_url.trim().to_string(),
            document_type: self.document_type.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_http_scheme(value: &str) -> Result<(), ValidationError> {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("http_scheme"))
    }
}

/// A stored document: metadata row plus the derived blob attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Store-assigned ID.
    pub id: DocumentId,
    /// Document title.
    pub title: String,
    /// Issuing institution.
    pub institution_name: String,
    /// Kind of institution.
    pub institution_type: String,
    /// Institution website.
    pub institution_url: String,
    /// Document classification.
    pub document_type: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Blob store key. Set once at upload.
    pub object_key: String,
    /// Presigned retrieval URL (last issued).
    pub retrieval_url: String,
    /// Human-readable content size.
    pub size_label: String,
    /// Upload instant.
    pub uploaded_at: DateTime<Utc>,
    /// Last metadata change.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// The editable part of this document.
    #[must_use]
    pub fn fields(&self) -> DocumentFields {
        DocumentFields {
            title: self.title.clone(),
            institution_name: self.institution_name.clone(),
            institution_type: self.institution_type.clone(),
            institution_url: self.institution_url.clone(),
            document_type: self.document_type.clone(),
            description: self.description.clone(),
        }
    }
}

/// Input for persisting a freshly uploaded document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Editable metadata.
    pub fields: DocumentFields,
    /// Blob store key.
    pub object_key: String,
    /// Presigned retrieval URL.
    pub retrieval_url: String,
    /// Human-readable content size.
    pub size_label: String,
    /// Upload instant; also the initial `updated_at`.
    pub uploaded_at: DateTime<Utc>,
}

/// Input for [`DocumentService::upload_with_metadata`](super::DocumentService::upload_with_metadata).
#[derive(Debug, Clone)]
pub struct UploadInput {
    /// File content.
    pub content: Bytes,
    /// Original filename, used only for its extension.
    pub filename: Option<String>,
    /// MIME type reported by the client.
    pub content_type: Option<String>,
    /// Size the caller declared for the content.
    pub declared_size: u64,
    /// Editable metadata.
    pub fields: DocumentFields,
}

impl UploadInput {
    /// Build an upload whose declared size is the content length.
    #[must_use]
    pub fn new(content: Bytes, fields: DocumentFields) -> Self {
        Self {
            declared_size: content.len() as u64,
            content,
            filename: None,
            content_type: None,
            fields,
        }
    }

    /// Set the original filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
