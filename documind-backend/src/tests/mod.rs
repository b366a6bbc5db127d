use std::sync::{Arc, Once};

use axum::http::header::{HeaderName, HeaderValue, CONTENT_DISPOSITION};
use axum_test::*;
use tokio::sync::RwLock;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use crate::ai::stub::StubGateway;
use crate::ai::{AiGateway, OpenAiClient};
use crate::auth::USER_ID_HEADER;
use crate::chat::ChatResponse;
use crate::document::{AnalyzeResponse, DocumentListResponse, DocumentResponse};
use crate::entity::document::DocStatus;
use crate::generate::GenerateResponse;
use crate::{build_app, AppState};

static INIT: Once = Once::new();

async fn setup_test_server(ai: Arc<dyn AiGateway>) -> TestServer {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                "documind_backend=debug,tower_http=debug",
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
    let appstate = AppState::test(ai).await;
    let shared_state = Arc::new(RwLock::new(appstate));
    let app = build_app(&shared_state);

    let config = TestServerConfig {
        expect_success_by_default: true,
        restrict_requests_with_http_schema: false,
        default_content_type: None,
        default_scheme: Some("http".into()),
        ..Default::default()
    };

    TestServer::new_with_config(app, config).unwrap()
}

fn user_header(user: Uuid) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(USER_ID_HEADER),
        HeaderValue::from_str(&user.to_string()).unwrap(),
    )
}

fn stub_with_analysis(analysis: &str) -> Arc<dyn AiGateway> {
    Arc::new(StubGateway {
        analysis: Some(analysis.to_string()),
        ..Default::default()
    })
}

/// Gateway where every operation fails.
fn failing_stub() -> Arc<dyn AiGateway> {
    Arc::new(StubGateway::default())
}

#[tokio::test]
async fn test_health() {
    let server = setup_test_server(failing_stub()).await;
    let res = server.get("/api/v1/health").await;
    res.assert_status_ok();
    assert_eq!(res.json::<serde_json::Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_requires_identity_header() {
    let server = setup_test_server(failing_stub()).await;

    let res = server.get("/api/v1/documents").expect_failure().await;
    assert_eq!(res.status_code(), 401);

    let (name, _) = user_header(Uuid::new_v4());
    let res = server
        .get("/api/v1/documents")
        .add_header(name, HeaderValue::from_static("not-a-uuid"))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 401);
}

#[tokio::test]
async fn test_api_document_crud() {
    let server = setup_test_server(failing_stub()).await;
    let user = Uuid::new_v4();
    let (name, value) = user_header(user);

    // Direct-create scenario
    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({
            "title": "Q3 Plan",
            "content": "Draft text",
            "tags": ["finance", "q3"],
        }))
        .await;
    assert_eq!(res.status_code(), 201);
    let created = res.json::<DocumentResponse>().document;
    assert_eq!(created.title, "Q3 Plan");
    assert_eq!(created.status, DocStatus::Draft);
    assert_eq!(created.content, Some("Draft text".to_string()));
    assert_eq!(
        created.tags.0,
        vec!["finance".to_string(), "q3".to_string()]
    );
    assert!(created.file_path.is_none());
    assert_eq!(created.owner_id, user);

    // Fetch it back
    let res = server
        .get(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), value.clone())
        .await;
    res.assert_status_ok();
    let fetched = res.json::<DocumentResponse>().document;
    assert_eq!(fetched.id, created.id);

    // Missing title is a validation error
    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"title": "", "content": "x"}))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);

    // Partial update: status only, everything else untouched
    let res = server
        .put(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"status": "final"}))
        .await;
    res.assert_status_ok();
    let updated = res.json::<DocumentResponse>().document;
    assert_eq!(updated.status, DocStatus::Final);
    assert_eq!(updated.title, "Q3 Plan");
    assert_eq!(updated.content, Some("Draft text".to_string()));
    assert_eq!(
        updated.tags.0,
        vec!["finance".to_string(), "q3".to_string()]
    );
    assert!(updated.updated >= created.updated);
    assert_eq!(updated.created, created.created);

    // Delete
    let res = server
        .delete(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), value.clone())
        .await;
    res.assert_status_ok();

    let res = server
        .get(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), value.clone())
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);

    // Unknown id
    let res = server
        .get(&format!("/api/v1/documents/{}", Uuid::new_v4()))
        .add_header(name, value)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn test_api_cross_owner_isolation() {
    let server = setup_test_server(failing_stub()).await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let (name, owner_value) = user_header(owner);
    let (_, stranger_value) = user_header(stranger);

    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), owner_value.clone())
        .json(&serde_json::json!({"title": "Private", "content": "secret"}))
        .await;
    let created = res.json::<DocumentResponse>().document;

    // Another owner's document is indistinguishable from a missing one
    let res = server
        .get(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), stranger_value.clone())
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);

    let res = server
        .put(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), stranger_value.clone())
        .json(&serde_json::json!({"title": "Hijacked"}))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);

    let res = server
        .delete(&format!("/api/v1/documents/{}", created.id))
        .add_header(name.clone(), stranger_value.clone())
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);

    let res = server
        .get("/api/v1/documents")
        .add_header(name.clone(), stranger_value)
        .await;
    assert!(res.json::<DocumentListResponse>().documents.is_empty());

    // Untouched for the real owner
    let res = server
        .get(&format!("/api/v1/documents/{}", created.id))
        .add_header(name, owner_value)
        .await;
    res.assert_status_ok();
}

#[tokio::test]
async fn test_api_list_filters() {
    let server = setup_test_server(failing_stub()).await;
    let user = Uuid::new_v4();
    let (name, value) = user_header(user);

    for (title, status) in [
        ("Q3 Plan", "draft"),
        ("Q3 Report", "draft"),
        ("Q3 Budget", "final"),
        ("Q2 Summary", "draft"),
    ] {
        server
            .post("/api/v1/documents")
            .add_header(name.clone(), value.clone())
            .json(&serde_json::json!({"title": title, "content": "text", "status": status}))
            .await
            .assert_status_success();
    }

    let res = server
        .get("/api/v1/documents?status=draft&search=q3")
        .add_header(name.clone(), value.clone())
        .await;
    res.assert_status_ok();
    let documents = res.json::<DocumentListResponse>().documents;
    let titles: Vec<&str> = documents.iter().map(|d| d.title.as_str()).collect();
    // Case-insensitive title match, both filters applied, newest-updated first
    assert_eq!(titles, vec!["Q3 Report", "Q3 Plan"]);

    // Touching a document moves it to the front of the list
    let oldest = documents[1].id;
    server
        .put(&format!("/api/v1/documents/{}", oldest))
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"content": "revised"}))
        .await
        .assert_status_ok();

    let res = server
        .get("/api/v1/documents?status=draft&search=q3")
        .add_header(name, value)
        .await;
    let documents = res.json::<DocumentListResponse>().documents;
    assert_eq!(documents[0].id, oldest);
}

#[tokio::test]
async fn test_api_upload_download_delete() {
    let server = setup_test_server(failing_stub()).await;
    let user = Uuid::new_v4();
    let (name, value) = user_header(user);

    let file_content = b"This is a test file content for upload testing.";
    let form = axum_test::multipart::MultipartForm::new()
        .add_text("title", "Q3 Figures")
        .add_text("description", "Uploaded from tests")
        .add_text("tags", "finance,q3")
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(file_content.to_vec())
                .file_name("figures.CSV")
                .mime_type("text/csv"),
        );

    debug!("uploading document for user {}", user);
    let res = server
        .post("/api/v1/documents/upload")
        .add_header(name.clone(), value.clone())
        .multipart(form)
        .await;
    assert_eq!(res.status_code(), 201);
    let document = res.json::<DocumentResponse>().document;
    assert_eq!(document.title, "Q3 Figures");
    assert_eq!(document.content, Some("Uploaded from tests".to_string()));
    assert_eq!(document.file_type, Some("csv".to_string()));
    assert_eq!(document.file_size, Some(file_content.len() as i64));
    assert_eq!(
        document.tags.0,
        vec!["finance".to_string(), "q3".to_string()]
    );

    // Download round-trips the bytes with a suggested filename
    let res = server
        .get(&format!("/api/v1/documents/{}/download", document.id))
        .add_header(name.clone(), value.clone())
        .await;
    res.assert_status_ok();
    assert_eq!(res.as_bytes().as_ref(), file_content);
    let disposition = res.header(CONTENT_DISPOSITION);
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("Q3 Figures.csv"));

    // Delete removes the record and the file
    server
        .delete(&format!("/api/v1/documents/{}", document.id))
        .add_header(name.clone(), value.clone())
        .await
        .assert_status_ok();

    let res = server
        .get(&format!("/api/v1/documents/{}/download", document.id))
        .add_header(name, value)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn test_api_upload_missing_file_field() {
    let server = setup_test_server(failing_stub()).await;
    let (name, value) = user_header(Uuid::new_v4());

    let form = axum_test::multipart::MultipartForm::new().add_text("title", "No file here");
    let res = server
        .post("/api/v1/documents/upload")
        .add_header(name, value)
        .multipart(form)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);
}

#[tokio::test]
async fn test_api_upload_analysis_failure_is_best_effort() {
    let server = setup_test_server(failing_stub()).await;
    let (name, value) = user_header(Uuid::new_v4());

    let form = axum_test::multipart::MultipartForm::new()
        .add_text("analyze", "true")
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(b"analyze me".to_vec())
                .file_name("notes.txt")
                .mime_type("text/plain"),
        );

    // The gateway fails, the upload must not
    let res = server
        .post("/api/v1/documents/upload")
        .add_header(name, value)
        .multipart(form)
        .await;
    assert_eq!(res.status_code(), 201);
    let document = res.json::<DocumentResponse>().document;
    assert!(!document.id.is_nil());
    assert!(document.file_path.is_some());
    assert_eq!(document.analysis, None);
    // Title defaulted to the original filename
    assert_eq!(document.title, "notes.txt");
}

#[tokio::test]
async fn test_api_upload_with_analysis() {
    let server = setup_test_server(stub_with_analysis("STUB ANALYSIS")).await;
    let (name, value) = user_header(Uuid::new_v4());

    let form = axum_test::multipart::MultipartForm::new()
        .add_text("analyze", "true")
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(b"analyze me".to_vec())
                .file_name("notes.txt")
                .mime_type("text/plain"),
        );

    let res = server
        .post("/api/v1/documents/upload")
        .add_header(name, value)
        .multipart(form)
        .await;
    assert_eq!(res.status_code(), 201);
    let document = res.json::<DocumentResponse>().document;
    assert_eq!(document.analysis, Some("STUB ANALYSIS".to_string()));
}

#[tokio::test]
async fn test_api_analyze_endpoint() {
    let server = setup_test_server(stub_with_analysis("FRESH ANALYSIS")).await;
    let (name, value) = user_header(Uuid::new_v4());

    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"title": "Inline", "content": "inline body"}))
        .await;
    let created = res.json::<DocumentResponse>().document;

    let res = server
        .post(&format!("/api/v1/documents/{}/analyze", created.id))
        .add_header(name.clone(), value.clone())
        .await;
    res.assert_status_ok();
    let analyzed = res.json::<AnalyzeResponse>();
    assert_eq!(analyzed.analysis, "FRESH ANALYSIS");
    assert_eq!(
        analyzed.document.analysis,
        Some("FRESH ANALYSIS".to_string())
    );

    // Re-running overwrites, not appends
    let res = server
        .post(&format!("/api/v1/documents/{}/analyze", created.id))
        .add_header(name, value)
        .await;
    let analyzed = res.json::<AnalyzeResponse>();
    assert_eq!(
        analyzed.document.analysis,
        Some("FRESH ANALYSIS".to_string())
    );
}

#[tokio::test]
async fn test_api_analyze_no_content() {
    let server = setup_test_server(stub_with_analysis("NEVER USED")).await;
    let (name, value) = user_header(Uuid::new_v4());

    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"title": "Empty"}))
        .await;
    let created = res.json::<DocumentResponse>().document;

    let res = server
        .post(&format!("/api/v1/documents/{}/analyze", created.id))
        .add_header(name.clone(), value.clone())
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);

    // The failed run must not touch the document
    let res = server
        .get(&format!("/api/v1/documents/{}", created.id))
        .add_header(name, value)
        .await;
    let unchanged = res.json::<DocumentResponse>().document;
    assert_eq!(unchanged.updated, created.updated);
    assert_eq!(unchanged.analysis, None);
}

#[tokio::test]
async fn test_api_analyze_gateway_failure_is_visible() {
    let server = setup_test_server(failing_stub()).await;
    let (name, value) = user_header(Uuid::new_v4());

    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"title": "Inline", "content": "body"}))
        .await;
    let created = res.json::<DocumentResponse>().document;

    let res = server
        .post(&format!("/api/v1/documents/{}/analyze", created.id))
        .add_header(name, value)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 502);
}

#[tokio::test]
async fn test_api_analyze_unconfigured_provider() {
    // A real client with no credential fails fast with a configuration error
    let client = OpenAiClient::new(
        url::Url::parse("https://api.openai.invalid/v1/chat/completions").unwrap(),
        "gpt-3.5-turbo".to_string(),
        None,
    )
    .unwrap();
    let server = setup_test_server(Arc::new(client)).await;
    let (name, value) = user_header(Uuid::new_v4());

    let res = server
        .post("/api/v1/documents")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({"title": "Inline", "content": "body"}))
        .await;
    let created = res.json::<DocumentResponse>().document;

    let res = server
        .post(&format!("/api/v1/documents/{}/analyze", created.id))
        .add_header(name, value)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 503);
}

#[tokio::test]
async fn test_api_generate() {
    let gateway = Arc::new(StubGateway {
        generated: Some("MEMO BODY".to_string()),
        ..Default::default()
    });
    let server = setup_test_server(gateway).await;
    let (name, value) = user_header(Uuid::new_v4());

    let res = server
        .post("/api/v1/generate")
        .add_header(name.clone(), value.clone())
        .json(&serde_json::json!({
            "type": "memo",
            "title": "Policy Update",
            "description": "Remote work policy change",
        }))
        .await;
    assert_eq!(res.status_code(), 201);
    let generated = res.json::<GenerateResponse>();
    assert_eq!(generated.content, "MEMO BODY");
    assert_eq!(generated.document.content, Some("MEMO BODY".to_string()));
    assert_eq!(generated.document.file_type, Some("md".to_string()));
    assert_eq!(generated.document.status, DocStatus::Draft);

    // Missing fields are rejected before the gateway is called
    let res = server
        .post("/api/v1/generate")
        .add_header(name, value)
        .json(&serde_json::json!({"type": "memo", "title": "", "description": "x"}))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);
}

#[tokio::test]
async fn test_api_chat() {
    let gateway = Arc::new(StubGateway {
        chat: Some("Hello from DocuMind".to_string()),
        ..Default::default()
    });
    let server = setup_test_server(gateway).await;

    let res = server
        .post("/api/v1/chat")
        .json(&serde_json::json!({
            "messages": [{"role": "user", "content": "hi"}],
        }))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<ChatResponse>().response, "Hello from DocuMind");

    let res = server
        .post("/api/v1/chat")
        .json(&serde_json::json!({"messages": []}))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);
}
