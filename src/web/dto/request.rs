//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::ToSchema;

/// Body of a content update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContentForm {
    /// Replacement text content.
    pub content: String,
}

/// Multipart upload form (documentation only; parsed field by field).
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// The file to upload.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
