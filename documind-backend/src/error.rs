//! Error types
//!

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;

/// Service-level error taxonomy. Handlers convert these into [`WebError`]
/// responses; best-effort paths catch and log them instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no content available to analyze")]
    NoContent,
    #[error("AI provider not configured: {0}")]
    Configuration(String),
    #[error("AI provider call failed: {0}")]
    Gateway(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: String) -> Self {
        WebError { status, message }
    }

    pub fn not_found(message: String) -> Self {
        WebError {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        let mut response = axum::response::Response::new(body.to_string().into());
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<Error> for WebError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::NoContent => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Gateway(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        WebError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for WebError {
    fn from(err: sea_orm::DbErr) -> Self {
        WebError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Database error: {:?}", err),
        }
    }
}

impl From<serde_json::Error> for WebError {
    fn from(err: serde_json::Error) -> Self {
        WebError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Serialization error: {:?}", err),
        }
    }
}
