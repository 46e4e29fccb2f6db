//! Blob storage for filegate.
//!
//! `BlobStorage` is the capability the service layer depends on.
//! `LocalStorage` keeps blobs on the local filesystem in a sharded layout:
//! ```text
//! {base_path}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012_report.pdf
//! ├── cd/
//! │   └── cd90ab12-3456-7890-abcd-ef1234567890_notes.txt
//! └── ...
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::{FilegateError, Result};

/// Result of writing a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Number of bytes written.
    pub size: u64,
    /// Path under which the blob can be retrieved later.
    pub path: String,
}

/// Raw byte storage keyed by a storage key.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `content` under `key`.
    async fn upload(&self, content: Bytes, key: &str) -> Result<StoredBlob>;

    /// Resolve a stored path to a readable local file path.
    async fn get_file(&self, path: &str) -> Result<PathBuf>;

    /// Delete a blob. Returns false if it did not exist.
    async fn delete_file(&self, path: &str) -> Result<bool>;

    /// Delete every blob.
    async fn delete_all_files(&self) -> Result<()>;
}

/// Filesystem implementation of `BlobStorage`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base directory for blob storage.
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the full file path for a storage key.
    ///
    /// The path is constructed as: {base_path}/{shard}/{key}
    /// where shard is the first 2 characters of the key (UUID prefix).
    pub fn get_file_path(&self, key: &str) -> PathBuf {
        self.base_path.join(Self::get_shard(key)).join(key)
    }

    fn get_shard(key: &str) -> &str {
        key.get(..2).unwrap_or(key)
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(FilegateError::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(())
    }

    /// Check that `path` names something inside the base directory.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let candidate = PathBuf::from(path);

        let escapes = candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !candidate.starts_with(&self.base_path) || candidate == self.base_path {
            return Err(FilegateError::Storage(format!(
                "path outside storage directory: {path}"
            )));
        }

        Ok(candidate)
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    async fn upload(&self, content: Bytes, key: &str) -> Result<StoredBlob> {
        Self::validate_key(key)?;
        let file_path = self.get_file_path(key);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FilegateError::Storage(format!("create {parent:?}: {e}")))?;
        }

        fs::write(&file_path, &content)
            .await
            .map_err(|e| FilegateError::Storage(format!("write {file_path:?}: {e}")))?;

        debug!(path = %file_path.display(), size = content.len(), "blob stored");

        Ok(StoredBlob {
            size: content.len() as u64,
            path: file_path.to_string_lossy().into_owned(),
        })
    }

    async fn get_file(&self, path: &str) -> Result<PathBuf> {
        self.resolve(path)
    }

    async fn delete_file(&self, path: &str) -> Result<bool> {
        let file_path = self.resolve(path)?;

        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(FilegateError::Storage(format!(
                    "delete {file_path:?}: {e}"
                )))
            }
        }

        // Drop the shard directory once its last blob is gone
        if let Some(shard) = file_path.parent() {
            if shard != self.base_path {
                let _ = fs::remove_dir(shard).await;
            }
        }

        Ok(true)
    }

    async fn delete_all_files(&self) -> Result<()> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FilegateError::Storage(e.to_string())),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FilegateError::Storage(e.to_string()))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FilegateError::Storage(e.to_string()))?;

            let result = if file_type.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            result.map_err(|e| FilegateError::Storage(format!("delete {path:?}: {e}")))?;
        }

        Ok(())
    }
}
