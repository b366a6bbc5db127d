//! Handler for AI document generation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::auth::OwnerId;
use crate::entity::document;
use crate::error::WebError;
use crate::service::{self, GenerateRequest};
use crate::SharedState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub document: document::Model,
    /// The raw generated text, also stored as the document's content.
    pub content: String,
}

/// Generate a markdown document from a short brief and store it as a draft.
/// POST /api/v1/generate
#[utoipa::path(
    post,
    path = "/api/v1/generate",
    request_body = GenerateRequest,
    responses(
        (status = 201, body = GenerateResponse),
        (status = 400, description = "Missing required fields"),
        (status = 502, description = "Provider failure"),
    )
)]
pub async fn generate_document(
    State(state): State<SharedState>,
    owner: OwnerId,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), WebError> {
    info!(
        "Generating {} document for owner {}",
        request.document_type, owner.0
    );

    let reader = state.read().await;
    let (document, content) =
        service::generate_create(&reader.conn, reader.ai.as_ref(), owner.0, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse { document, content }),
    ))
}
