//! Response DTOs for Web API.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::file::{FileRecord, UploadOutcome};

/// File record as returned by listing and upload. The storage path is not
/// exposed here.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileResponse {
    /// File ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// SHA-256 of the extracted content.
    pub hash: Option<String>,
    /// Sanitized filename.
    pub filename: String,
    /// Derived data (`content` holds extracted text).
    #[schema(value_type = Object)]
    pub data: Value,
    /// Upload metadata (`name`, `content_type`, `size`, ...).
    #[schema(value_type = Object)]
    pub meta: Value,
    /// Creation time (epoch seconds).
    pub created_at: i64,
    /// Last update time (epoch seconds).
    pub updated_at: i64,
    /// Processing failure reported by an upload that otherwise succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            meta: serde_json::to_value(&record.meta).unwrap_or(Value::Null),
            id: record.id,
            user_id: record.user_id,
            hash: record.hash,
            filename: record.filename,
            data: record.data,
            created_at: record.created_at,
            updated_at: record.updated_at,
            error: None,
        }
    }
}

impl From<UploadOutcome> for FileResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            error: outcome.error,
            ..Self::from(outcome.record)
        }
    }
}

/// Full file record, including the storage path.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileModelResponse {
    /// File ID.
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// SHA-256 of the extracted content.
    pub hash: Option<String>,
    /// Sanitized filename.
    pub filename: String,
    /// Storage path, absent for text-only records.
    pub path: Option<String>,
    /// Derived data.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Upload metadata.
    #[schema(value_type = Object)]
    pub meta: Value,
    /// Creation time (epoch seconds).
    pub created_at: i64,
    /// Last update time (epoch seconds).
    pub updated_at: i64,
}

impl From<FileRecord> for FileModelResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            meta: serde_json::to_value(&record.meta).unwrap_or(Value::Null),
            id: record.id,
            user_id: record.user_id,
            hash: record.hash,
            filename: record.filename,
            path: record.path,
            data: record.data,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Extracted text content.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContentResponse {
    /// Text content, empty when none was extracted.
    pub content: String,
}

/// Plain status message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
