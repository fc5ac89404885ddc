//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types, one per failure class the HTTP boundary reports.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, malformed, or expired credentials.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (empty file, blank field, malformed URL).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body exceeds the upload ceiling.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Blob store failure (put, presign, remove).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Metadata store failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::Storage(_) => 502,
            Self::Persistence(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message is safe to show to API clients.
    ///
    /// Storage and persistence messages carry driver output and are replaced
    /// by a generic message at the boundary.
    #[must_use]
    pub const fn is_client_facing(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::NotFound(_) | Self::Validation(_) | Self::PayloadTooLarge(_)
        )
    }
}
