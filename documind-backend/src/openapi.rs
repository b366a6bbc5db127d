use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(description = "DocuMind API Documentation", license(name = "MIT or Apache2", identifier="MIT Apache2.0"), title = "DocuMind", version = env!("CARGO_PKG_VERSION")),
    paths(
        crate::document::list_documents,
        crate::document::get_document,
        crate::document::create_document,
        crate::document::upload_document,
        crate::document::update_document,
        crate::document::delete_document,
        crate::document::download_document,
        crate::document::analyze_document,
        crate::generate::generate_document,
        crate::chat::chat
    )
)]
pub struct ApiDoc;

pub(crate) fn api_route<T: Clone + Sync + Send + 'static>() -> Router<T> {
    let doc = ApiDoc::openapi();
    Router::new().merge(SwaggerUi::new("/api/v1/swagger-ui").url("/api/v1/openapi.json", doc))
}
