//! Document management routes.

use axum::{
    Json, Router,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::{AppState, middleware::AuthUser};
use docstore_core::document::{Document, DocumentFields, DocumentId, UploadInput};
use docstore_shared::AppError;

/// Creates the document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(upload_document))
        .route("/documents/search", get(search_documents))
        .route("/documents/filter", get(filter_documents))
        .route("/documents/institution/{name}", get(documents_by_institution))
        .route("/documents/type/{document_type}", get(documents_by_type))
        .route(
            "/documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/documents/{id}/url", get(refresh_url))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query for `GET /documents/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Title fragment.
    pub title: Option<String>,
}

/// Query for `GET /documents/filter`.
#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    /// Institution name.
    pub institution: Option<String>,
    /// Document type.
    #[serde(rename = "type")]
    pub document_type: Option<String>,
}

/// Response for a refreshed retrieval URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalUrlResponse {
    /// Document ID.
    pub id: DocumentId,
    /// Presigned URL.
    pub url: String,
    /// HTTP method to use.
    pub method: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

/// Multipart form fields collected for an upload.
#[derive(Debug, Default)]
struct UploadForm {
    content: Option<Bytes>,
    filename: Option<String>,
    content_type: Option<String>,
    title: Option<String>,
    institution_name: Option<String>,
    institution_type: Option<String>,
    institution_url: Option<String>,
    document_type: Option<String>,
    description: Option<String>,
}

impl UploadForm {
    /// Check presence and size, then build the coordinator input.
    fn into_input(self, max_file_size: u64) -> Result<UploadInput, AppError> {
        let content = self
            .content
            .ok_or_else(|| AppError::Validation("missing field 'file'".to_string()))?;

        if content.is_empty() {
            return Err(AppError::Validation("file is empty".to_string()));
        }
        let size = content.len() as u64;
        if size > max_file_size {
            return Err(AppError::Validation(format!(
                "file size {size} bytes exceeds maximum allowed {max_file_size} bytes"
            )));
        }

        let fields = DocumentFields {
            title: required(self.title, "title")?,
            institution_name: required(self.institution_name, "institutionName")?,
            institution_type: required(self.institution_type, "institutionType")?,
            institution_url: required(self.institution_url, "institutionUrl")?,
            document_type: required(self.document_type, "documentType")?,
            description: self.description,
        };

        let mut input = UploadInput::new(content, fields);
        input.filename = self.filename;
        input.content_type = self.content_type;
        Ok(input)
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("missing field '{name}'")))
}

fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("invalid multipart data: {}", err.body_text()))
    }
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            form.filename = field.file_name().map(str::to_string);
            form.content_type = field.content_type().map(str::to_string);
            form.content = Some(field.bytes().await.map_err(|e| multipart_error(&e))?);
            continue;
        }

        let value = field.text().await.map_err(|e| multipart_error(&e))?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "institutionName" => form.institution_name = Some(value),
            "institutionType" => form.institution_type = Some(value),
            "institutionUrl" => form.institution_url = Some(value),
            "documentType" => form.document_type = Some(value),
            "description" => form.description = Some(value),
            other => debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/documents`
/// Upload a file with its metadata.
async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let multipart =
        multipart.map_err(|e| AppError::Validation(format!("invalid multipart request: {e}")))?;

    let input = read_upload_form(multipart)
        .await?
        .into_input(state.documents.config().max_file_size)?;

    let document = state.documents.upload_with_metadata(input).await?;

    info!(
        subject = %auth.subject(),
        document_id = %document.id,
        "Document uploaded via API"
    );

    Ok((StatusCode::CREATED, Json(document)))
}

/// GET `/documents`
async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.list_documents().await?))
}

/// GET `/documents/{id}`
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.documents.get_document(id).await?))
}

/// GET `/documents/{id}/url`
/// Issue a fresh retrieval URL.
async fn refresh_url(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Json<RetrievalUrlResponse>> {
    let presigned = state.documents.refresh_retrieval_url(id).await?;

    Ok(Json(RetrievalUrlResponse {
        id,
        url: presigned.url,
        method: presigned.method,
        expires_at: presigned.expires_at,
    }))
}

/// PUT `/documents/{id}`
/// Replace the editable metadata fields.
async fn update_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    Json(fields): Json<DocumentFields>,
) -> ApiResult<Json<Document>> {
    let document = state.documents.update_document(id, fields).await?;

    info!(subject = %auth.subject(), document_id = %id, "Document updated via API");
    Ok(Json(document))
}

/// DELETE `/documents/{id}`
async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> ApiResult<StatusCode> {
    state.documents.delete_document(id).await?;

    info!(subject = %auth.subject(), document_id = %id, "Document deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/documents/institution/{name}`
async fn documents_by_institution(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.find_by_institution(&name).await?))
}

/// GET `/documents/type/{document_type}`
async fn documents_by_type(
    State(state): State<AppState>,
    Path(document_type): Path<String>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.find_by_type(&document_type).await?))
}

/// GET `/documents/search?title=`
async fn search_documents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Document>>> {
    let title = query.title.unwrap_or_default();
    Ok(Json(state.documents.search_by_title(&title).await?))
}

/// GET `/documents/filter?institution=&type=`
async fn filter_documents(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Json<Vec<Document>>> {
    let (Some(institution), Some(document_type)) = (query.institution, query.document_type)
    else {
        return Err(ApiError(AppError::Validation(
            "both 'institution' and 'type' are required".to_string(),
        )));
    };

    Ok(Json(
        state
            .documents
            .find_by_institution_and_type(&institution, &document_type)
            .await?,
    ))
}
