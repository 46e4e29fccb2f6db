//! File record types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Descriptive metadata captured at upload time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Original (sanitized) filename.
    #[serde(default)]
    pub name: String,
    /// Content type declared by the client, if any.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Size in bytes of the stored blob.
    #[serde(default)]
    pub size: u64,
    /// Any further keys a collaborator attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileMeta {
    /// Create metadata for a freshly uploaded blob.
    pub fn new(name: impl Into<String>, content_type: Option<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            content_type,
            size,
            extra: Map::new(),
        }
    }
}

/// A file record as held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// SHA-256 of the derived content, set by the processor.
    pub hash: Option<String>,
    /// Sanitized original filename.
    pub filename: String,
    /// Storage path, `None` for records without a blob.
    pub path: Option<String>,
    /// Derived data. The `content` key holds extracted text.
    pub data: Value,
    /// Upload metadata.
    pub meta: FileMeta,
    /// Creation time (epoch seconds).
    pub created_at: i64,
    /// Last data or hash update (epoch seconds).
    pub updated_at: i64,
}

impl FileRecord {
    /// The extracted text, if the processor stored any.
    pub fn content(&self) -> Option<&str> {
        self.data.get("content").and_then(Value::as_str)
    }

    /// Name to offer in download headers.
    pub fn display_name(&self) -> &str {
        if self.meta.name.is_empty() {
            &self.filename
        } else {
            &self.meta.name
        }
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Identifier chosen by the caller.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Sanitized filename.
    pub filename: String,
    /// Storage path of the blob.
    pub path: Option<String>,
    /// Upload metadata.
    pub meta: FileMeta,
}

impl NewFile {
    /// Create a new NewFile.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        filename: impl Into<String>,
        meta: FileMeta,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            filename: filename.into(),
            path: None,
            meta,
        }
    }

    /// Set the storage path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}
