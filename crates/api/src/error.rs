//! Error responses for the HTTP boundary.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docstore_core::document::DocumentError;
use docstore_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// Handler error rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_client_facing() {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
            self.0.to_string()
        } else {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
            match self.0 {
                AppError::Storage(_) => "Storage operation failed".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}
