//! Document coordinator error types.

use docstore_shared::AppError;
use thiserror::Error;
use validator::ValidationErrors;

use super::types::DocumentId;
use crate::storage::StorageError;

/// Document operation errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Invalid input: empty or oversized file, bad metadata field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Blob store operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No document with this ID.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Metadata store operation failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DocumentError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(id: DocumentId) -> Self {
        Self::NotFound(id)
    }

    /// Create a persistence error.
    #[must_use]
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

impl From<ValidationErrors> for DocumentError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<String> = errs.iter().map(|e| e.code.to_string()).collect();
                format!("{field} ({})", codes.join(", "))
            })
            .collect();
        fields.sort();
        Self::Validation(format!("invalid fields: {}", fields.join("; ")))
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Validation(msg) => Self::Validation(msg),
            DocumentError::NotFound(id) => Self::NotFound(format!("document {id}")),
            DocumentError::Storage(e) => Self::Storage(e.to_string()),
            DocumentError::Persistence(msg) => Self::Persistence(msg),
        }
    }
}
