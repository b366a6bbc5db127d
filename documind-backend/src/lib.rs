pub mod ai;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod db;
pub mod document;
pub mod entity;
pub mod error;
pub mod filestore;
pub mod generate;
pub mod logging;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod service;
pub mod storage;
#[cfg(test)]
mod tests;

use std::{borrow::Cow, sync::Arc, time::Duration};

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{header, Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;
use tower::{BoxError, ServiceBuilder};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};
use tracing::error;

use crate::{
    ai::{AiGateway, OpenAiClient},
    chat::chat,
    cli::{db_path_default, storage_root_default, CliOpts},
    document::{
        analyze_document, create_document, delete_document, download_document, get_document,
        list_documents, update_document, upload_document,
    },
    error::Error,
    filestore::FileStore,
    generate::generate_document,
    logging::logging_layer,
};

/// Uploads larger than this are rejected outright.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub type SharedState = Arc<RwLock<AppState>>;

pub struct AppState {
    pub conn: DatabaseConnection,
    pub files: FileStore,
    pub ai: Arc<dyn AiGateway>,
}

impl AppState {
    pub async fn new(cli: &CliOpts) -> Result<Self, Error> {
        let conn = storage::new(&cli.db_path.clone().unwrap_or(db_path_default().into())).await?;
        let files = FileStore::new(
            cli.storage_root
                .clone()
                .unwrap_or(storage_root_default().into()),
        );
        let ai: Arc<dyn AiGateway> = Arc::new(OpenAiClient::from_env()?);
        Ok(Self { conn, files, ai })
    }

    #[cfg(test)]
    pub async fn test(ai: Arc<dyn AiGateway>) -> Self {
        let conn = storage::start_db(None)
            .await
            .expect("Failed to start test DB");
        let files = FileStore::new(
            std::env::temp_dir().join(format!("documind-test-{}", uuid::Uuid::new_v4())),
        );
        Self { conn, files, ai }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

pub fn build_app<T>(shared_state: &SharedState) -> Router<T> {
    let static_service = ServeDir::new("./dist/").append_index_html_on_directories(true);

    // Build our application by composing routes
    let router = Router::new()
        .route(
            "/api/v1/documents",
            get(list_documents).post(create_document),
        )
        .route(
            "/api/v1/documents/upload",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/api/v1/documents/{id}/download", get(download_document))
        .route("/api/v1/documents/{id}/analyze", post(analyze_document))
        .route("/api/v1/generate", post(generate_document))
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/health", get(health))
        .merge(openapi::api_route())
        .nest_service("/static", static_service.clone())
        .fallback_service(static_service);

    router
        // Add middleware to all routes
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(middleware::corslayer())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    |response: &Response<Body>| {
                        if response.status() == StatusCode::OK {
                            "private, no-transform max-age=0".parse().ok()
                        } else {
                            None
                        }
                    },
                ))
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(120))
                .layer(logging_layer()),
        )
        .with_state(shared_state.clone())
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        let msg = "service is overloaded, try again later";
        error!("{}", msg);
        return (StatusCode::SERVICE_UNAVAILABLE, Cow::from(msg));
    }

    let msg = format!("Unhandled internal error: {error}");
    error!("{}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, Cow::from(msg))
}

#[tokio::test]
async fn test_handle_error() {
    let err = tower::timeout::error::Elapsed::new();
    let res = handle_error(Box::new(err)).await.into_response();
    let expected = (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out")).into_response();

    assert_eq!(res.status(), expected.status());

    let err = tower::load_shed::error::Overloaded::new();
    let res = handle_error(Box::new(err)).await.into_response();
    let expected = (
        StatusCode::SERVICE_UNAVAILABLE,
        Cow::from("service is overloaded, try again later"),
    )
        .into_response();

    assert_eq!(res.status(), expected.status());
}
