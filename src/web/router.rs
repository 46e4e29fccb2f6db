//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::logging;

use super::handlers::{
    delete_all_files, delete_file, get_file, get_file_content, get_file_content_by_name,
    get_file_data_content, get_html_file_content, list_files, update_file_data_content,
    upload_file, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};
use super::openapi::ApiDoc;

/// Slack on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = (app_state.max_upload_size as usize).saturating_add(MULTIPART_OVERHEAD);

    let file_routes = Router::new()
        .route("/", post(upload_file).get(list_files))
        .route("/all", delete(delete_all_files))
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/data/content", get(get_file_data_content))
        .route("/:id/data/content/update", post(update_file_data_content))
        .route("/:id/content", get(get_file_content))
        .route("/:id/content/html", get(get_html_file_content))
        .route("/:id/content/:file_name", get(get_file_content_by_name))
        .layer(DefaultBodyLimit::max(body_limit));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api/v1/files", file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(logging::http_span))
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the router serving the OpenAPI document.
pub fn create_openapi_router() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
