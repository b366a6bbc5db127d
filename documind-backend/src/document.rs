//! Handlers for the documents resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::OwnerId;
use crate::db::document::DocumentFilter;
use crate::entity::document::{self, DocStatus};
use crate::error::WebError;
use crate::service::{self, CreateDocumentRequest, UpdateDocumentRequest, UploadRequest};
use crate::SharedState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    pub status: Option<DocStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<document::Model>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub document: document::Model,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub analysis: String,
    pub document: document::Model,
}

/// List the caller's documents, optionally filtered by status and a
/// case-insensitive title search.
/// GET /api/v1/documents
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    params(
        ("status" = Option<String>, Query, description = "Filter by document status"),
        ("search" = Option<String>, Query, description = "Case-insensitive title substring"),
    ),
    responses((status = 200, body = DocumentListResponse))
)]
pub async fn list_documents(
    State(state): State<SharedState>,
    owner: OwnerId,
    Query(query): Query<ListQuery>,
) -> Result<Json<DocumentListResponse>, WebError> {
    let documents = service::list_documents(
        &state.read().await.conn,
        owner.0,
        DocumentFilter {
            status: query.status,
            search: query.search,
        },
    )
    .await?;

    debug!("Listed {} documents for owner {}", documents.len(), owner.0);
    Ok(Json(DocumentListResponse { documents }))
}

/// Fetch a single document.
/// GET /api/v1/documents/{id}
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 200, body = DocumentResponse), (status = 404, description = "Not found"))
)]
pub async fn get_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, WebError> {
    let document = service::get_document(&state.read().await.conn, owner.0, id).await?;
    Ok(Json(DocumentResponse { document }))
}

/// Create a document from JSON, no file involved.
/// POST /api/v1/documents
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body = CreateDocumentRequest,
    responses((status = 201, body = DocumentResponse), (status = 400, description = "Validation error"))
)]
pub async fn create_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), WebError> {
    let document = service::direct_create(&state.read().await.conn, owner.0, request).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse { document })))
}

/// Upload a file and create its document record. Form fields: `file`
/// (required), `title`, `description`, `tags` (comma-separated) and
/// `analyze` ("true" to run AI analysis, best-effort).
/// POST /api/v1/documents/upload
#[utoipa::path(
    post,
    path = "/api/v1/documents/upload",
    responses((status = 201, body = DocumentResponse), (status = 400, description = "Bad upload"))
)]
pub async fn upload_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), WebError> {
    debug!("Starting file upload for owner {}", owner.0);

    let mut request = UploadRequest::default();
    let mut got_file = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {:?}", e);
        WebError::new(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        debug!("Processing field: {}", field_name);

        match field_name.as_str() {
            "file" => {
                request.filename = field.file_name().unwrap_or("").to_string();
                request.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        error!("Failed to read file data: {:?}", e);
                        WebError::new(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read file data: {}", e),
                        )
                    })?
                    .to_vec();
                got_file = true;
                debug!("Read {} bytes of {}", request.bytes.len(), request.filename);
            }
            "title" => {
                request.title = Some(read_text_field(field).await?);
            }
            "description" => {
                request.description = Some(read_text_field(field).await?);
            }
            "tags" => {
                let raw = read_text_field(field).await?;
                request.tags = split_tags(&raw);
            }
            "analyze" => {
                request.analyze = read_text_field(field).await? == "true";
            }
            _ => {
                debug!("Ignoring unknown multipart field: {}", field_name);
            }
        }
    }

    if !got_file {
        return Err(WebError::new(
            StatusCode::BAD_REQUEST,
            "Missing file data in upload".to_string(),
        ));
    }

    let reader = state.read().await;
    let document = service::upload_create(
        &reader.conn,
        &reader.files,
        reader.ai.as_ref(),
        owner.0,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse { document })))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, WebError> {
    field.text().await.map_err(|e| {
        WebError::new(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart field: {}", e),
        )
    })
}

/// Comma-separated form value to tag list; empty input means no tags.
fn split_tags(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|tag| tag.trim().to_string()).collect()
}

/// Apply a partial update to a document.
/// PUT /api/v1/documents/{id}
#[utoipa::path(
    put,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = UpdateDocumentRequest,
    responses((status = 200, body = DocumentResponse), (status = 404, description = "Not found"))
)]
pub async fn update_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, WebError> {
    let document =
        service::update_document(&state.read().await.conn, owner.0, id, request).await?;
    Ok(Json(DocumentResponse { document }))
}

/// Delete a document and (best-effort) its stored file.
/// DELETE /api/v1/documents/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, WebError> {
    let reader = state.read().await;
    service::delete_document(&reader.conn, &reader.files, owner.0, id).await?;
    Ok(Json(serde_json::json!({
        "message": "Document deleted successfully"
    })))
}

/// Download a document's stored file.
/// GET /api/v1/documents/{id}/download
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/download",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 200, description = "File bytes"), (status = 404, description = "Not found"))
)]
pub async fn download_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let reader = state.read().await;
    let download = service::download(&reader.conn, &reader.files, owner.0, id).await?;

    debug!("Downloading document {} for owner {}", id, owner.0);

    Ok((
        StatusCode::OK,
        [
            ("Content-Type", "application/octet-stream"),
            (
                "Content-Disposition",
                &format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.bytes,
    )
        .into_response())
}

/// Re-run AI analysis on a stored document. Unlike upload-time analysis,
/// failures here are reported to the caller.
/// POST /api/v1/documents/{id}/analyze
#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/analyze",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, body = AnalyzeResponse),
        (status = 400, description = "No content to analyze"),
        (status = 502, description = "Provider failure"),
    )
)]
pub async fn analyze_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalyzeResponse>, WebError> {
    let reader = state.read().await;
    let (analysis, document) =
        service::analyze_existing(&reader.conn, &reader.files, reader.ai.as_ref(), owner.0, id)
            .await?;
    Ok(Json(AnalyzeResponse { analysis, document }))
}
