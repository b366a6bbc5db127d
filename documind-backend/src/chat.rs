//! Handler for the chat resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::ai::ChatMessage;
use crate::error::WebError;
use crate::SharedState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
}

/// Converse with the document assistant.
/// POST /api/v1/chat
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, body = ChatResponse),
        (status = 400, description = "Missing messages"),
        (status = 502, description = "Provider failure"),
    )
)]
pub async fn chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, WebError> {
    if request.messages.is_empty() {
        return Err(WebError::new(
            StatusCode::BAD_REQUEST,
            "Missing messages in request".to_string(),
        ));
    }

    info!("Chat request received with {} messages", request.messages.len());

    let response = state
        .read()
        .await
        .ai
        .chat_respond(&request.messages)
        .await?;

    Ok(Json(ChatResponse { response }))
}
