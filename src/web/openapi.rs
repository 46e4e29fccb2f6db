//! OpenAPI document for the file routes.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    ContentForm, ContentResponse, FileModelResponse, FileResponse, MessageResponse, UploadForm,
};
use super::error::{ErrorBody, ErrorCode, ErrorDetail};
use super::handlers;

/// OpenAPI description of the API.
#[derive(OpenApi)]
#[openapi(
    info(title = "filegate", description = "File upload and retrieval API"),
    paths(
        handlers::upload_file,
        handlers::list_files,
        handlers::delete_all_files,
        handlers::get_file,
        handlers::get_file_data_content,
        handlers::update_file_data_content,
        handlers::get_file_content,
        handlers::get_html_file_content,
        handlers::get_file_content_by_name,
        handlers::delete_file,
    ),
    components(schemas(
        FileResponse,
        FileModelResponse,
        ContentResponse,
        MessageResponse,
        ContentForm,
        UploadForm,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
    )),
    modifiers(&SecurityAddon),
    tags((name = "files", description = "File management"))
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
