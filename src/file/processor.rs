//! Content processing.
//!
//! A `ContentProcessor` derives text from a stored file and writes it back
//! to the registry. `TextExtractor` is the default: it only understands
//! files that already are text.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::registry::FileRegistry;
use super::storage::BlobStorage;
use crate::{FilegateError, Result};

/// Derives content for a file record.
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    /// Process the file `file_id`.
    ///
    /// With `content` set, that text replaces whatever was derived before;
    /// otherwise the stored blob is read.
    async fn process(&self, file_id: &str, content: Option<String>) -> Result<()>;
}

/// Application types that carry text even though they are not `text/*`.
const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/ld+json",
    "application/xml",
    "application/yaml",
    "application/x-yaml",
    "application/toml",
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "application/typescript",
    "application/sql",
    "application/x-sh",
    "application/x-httpd-php",
    "application/csv",
];

fn is_textual_mime(mime: &str) -> bool {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || TEXTUAL_APPLICATION_TYPES.contains(&essence.as_str())
}

/// Whether a file looks like text, judged by its declared content type or,
/// failing that, by the type guessed from its name.
fn is_textual(content_type: Option<&str>, filename: &str) -> bool {
    if let Some(ct) = content_type {
        if is_textual_mime(ct) {
            return true;
        }
    }

    mime_guess::from_path(filename)
        .iter()
        .any(|guess| is_textual_mime(guess.essence_str()))
}

/// Hex encoded SHA-256 of `text`.
fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Default processor: stores the text of text-like files.
pub struct TextExtractor {
    registry: Arc<dyn FileRegistry>,
    storage: Arc<dyn BlobStorage>,
    max_content_bytes: usize,
}

impl TextExtractor {
    /// Create a new extractor.
    pub fn new(
        registry: Arc<dyn FileRegistry>,
        storage: Arc<dyn BlobStorage>,
        max_content_bytes: usize,
    ) -> Self {
        Self {
            registry,
            storage,
            max_content_bytes,
        }
    }

    fn check_size(&self, len: u64) -> Result<()> {
        if len > self.max_content_bytes as u64 {
            return Err(FilegateError::Processing(format!(
                "content exceeds {} bytes",
                self.max_content_bytes
            )));
        }
        Ok(())
    }

    async fn read_blob_text(&self, path: &str, content_type: Option<&str>, name: &str) -> Result<String> {
        if !is_textual(content_type, name) {
            return Err(FilegateError::Processing(format!(
                "unsupported file type: {}",
                content_type.unwrap_or("unknown")
            )));
        }

        let local = self.storage.get_file(path).await?;
        let size = tokio::fs::metadata(&local)
            .await
            .map_err(|e| FilegateError::Processing(format!("cannot stat {local:?}: {e}")))?
            .len();
        self.check_size(size)?;

        let bytes = tokio::fs::read(&local)
            .await
            .map_err(|e| FilegateError::Processing(format!("cannot read {local:?}: {e}")))?;

        String::from_utf8(bytes)
            .map_err(|_| FilegateError::Processing("file is not valid UTF-8 text".to_string()))
    }
}

#[async_trait]
impl ContentProcessor for TextExtractor {
    async fn process(&self, file_id: &str, content: Option<String>) -> Result<()> {
        let record = self
            .registry
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| FilegateError::Processing(format!("file {file_id} not found")))?;

        let text = match content {
            Some(text) => {
                self.check_size(text.len() as u64)?;
                text
            }
            None => {
                let path = record.path.as_deref().ok_or_else(|| {
                    FilegateError::Processing("file has no stored content".to_string())
                })?;
                self.read_blob_text(path, record.meta.content_type.as_deref(), record.display_name())
                    .await?
            }
        };

        let hash = content_hash(&text);
        debug!(file_id, bytes = text.len(), "storing extracted content");

        let vanished = || FilegateError::Processing(format!("file {file_id} not found"));
        self.registry
            .update_data(file_id, json!({ "content": text }))
            .await?
            .ok_or_else(vanished)?;
        self.registry
            .update_hash(file_id, &hash)
            .await?
            .ok_or_else(vanished)?;

        info!(file_id, %hash, "file processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::file::{FileMeta, FileRecord, LocalStorage, NewFile, SqliteFileRegistry};
    use bytes::Bytes;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        _db: Database,
        registry: Arc<dyn FileRegistry>,
        storage: Arc<dyn BlobStorage>,
        extractor: TextExtractor,
    }

    async fn setup(max_content_bytes: usize) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let registry: Arc<dyn FileRegistry> = Arc::new(SqliteFileRegistry::new(db.pool().clone()));
        let storage: Arc<dyn BlobStorage> = Arc::new(LocalStorage::new(temp_dir.path()).unwrap());
        let extractor = TextExtractor::new(registry.clone(), storage.clone(), max_content_bytes);
        Fixture {
            _temp_dir: temp_dir,
            _db: db,
            registry,
            storage,
            extractor,
        }
    }

    async fn store(fx: &Fixture, id: &str, name: &str, ct: Option<&str>, body: &'static [u8]) {
        let blob = fx
            .storage
            .upload(Bytes::from_static(body), &format!("{id}_{name}"))
            .await
            .unwrap();
        let meta = FileMeta::new(name, ct.map(str::to_string), blob.size);
        fx.registry
            .insert(&NewFile::new(id, "u1", name, meta).with_path(blob.path))
            .await
            .unwrap();
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual(Some("text/plain"), "x"));
        assert!(is_textual(Some("text/markdown; charset=utf-8"), "x"));
        assert!(is_textual(Some("application/json"), "x"));
        assert!(is_textual(Some("application/vnd.api+json"), "x"));
        assert!(is_textual(None, "readme.md"));
        assert!(is_textual(Some("application/octet-stream"), "data.csv"));
        assert!(!is_textual(Some("image/png"), "pic.png"));
        assert!(!is_textual(None, "archive.zip"));
        assert!(!is_textual(None, "no_extension"));
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_process_text_file() {
        let fx = setup(1024).await;
        store(&fx, "aa01", "hello.txt", Some("text/plain"), b"hello").await;

        fx.extractor.process("aa01", None).await.unwrap();

        let record = fx.registry.get_by_id("aa01").await.unwrap().unwrap();
        assert_eq!(record.content(), Some("hello"));
        assert_eq!(record.hash.as_deref(), Some(content_hash("hello").as_str()));
    }

    #[tokio::test]
    async fn test_process_guesses_from_name() {
        let fx = setup(1024).await;
        store(&fx, "aa02", "notes.md", None, b"# Title").await;

        fx.extractor.process("aa02", None).await.unwrap();
        let record = fx.registry.get_by_id("aa02").await.unwrap().unwrap();
        assert_eq!(record.content(), Some("# Title"));
    }

    #[tokio::test]
    async fn test_process_unsupported_type() {
        let fx = setup(1024).await;
        store(&fx, "aa03", "pic.png", Some("image/png"), b"\x89PNG").await;

        let err = fx.extractor.process("aa03", None).await.unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));

        let record = fx.registry.get_by_id("aa03").await.unwrap().unwrap();
        assert_eq!(record.content(), None);
        assert!(record.hash.is_none());
    }

    #[tokio::test]
    async fn test_process_invalid_utf8() {
        let fx = setup(1024).await;
        store(&fx, "aa04", "bad.txt", Some("text/plain"), b"\xff\xfe\xfd").await;

        let err = fx.extractor.process("aa04", None).await.unwrap_err();
        assert!(matches!(err, FilegateError::Processing(_)));
    }

    #[tokio::test]
    async fn test_process_too_large() {
        let fx = setup(4).await;
        store(&fx, "aa05", "big.txt", Some("text/plain"), b"12345").await;

        let err = fx.extractor.process("aa05", None).await.unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[tokio::test]
    async fn test_process_oversized_binary_blob() {
        let fx = setup(4).await;
        // Size is checked before decoding
        store(&fx, "aa07", "big.txt", Some("text/plain"), b"\xff\xfe\xfd\xfc\xfb").await;

        let err = fx.extractor.process("aa07", None).await.unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[tokio::test]
    async fn test_process_replacement_too_large() {
        let fx = setup(4).await;
        store(&fx, "aa08", "a.txt", Some("text/plain"), b"ok").await;

        let err = fx
            .extractor
            .process("aa08", Some("too long".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    /// Registry whose records disappear right after being looked up.
    struct VanishingRegistry(SqliteFileRegistry);

    #[async_trait]
    impl FileRegistry for VanishingRegistry {
        async fn insert(&self, new_file: &NewFile) -> Result<FileRecord> {
            self.0.insert(new_file).await
        }
        async fn get_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
            let record = self.0.get_by_id(id).await?;
            self.0.delete_by_id(id).await?;
            Ok(record)
        }
        async fn get_all(&self) -> Result<Vec<FileRecord>> {
            self.0.get_all().await
        }
        async fn get_by_user(&self, user_id: &str) -> Result<Vec<FileRecord>> {
            self.0.get_by_user(user_id).await
        }
        async fn update_data(&self, id: &str, data: serde_json::Value) -> Result<Option<FileRecord>> {
            self.0.update_data(id, data).await
        }
        async fn update_hash(&self, id: &str, hash: &str) -> Result<Option<FileRecord>> {
            self.0.update_hash(id, hash).await
        }
        async fn delete_by_id(&self, id: &str) -> Result<bool> {
            self.0.delete_by_id(id).await
        }
        async fn delete_all(&self) -> Result<bool> {
            self.0.delete_all().await
        }
    }

    #[tokio::test]
    async fn test_process_record_vanishes_before_update() {
        let fx = setup(1024).await;
        fx.registry
            .insert(&NewFile::new("gone", "u1", "g.txt", FileMeta::default()))
            .await
            .unwrap();

        let db_registry = SqliteFileRegistry::new(fx._db.pool().clone());
        let registry: Arc<dyn FileRegistry> = Arc::new(VanishingRegistry(db_registry));
        let extractor = TextExtractor::new(registry, fx.storage.clone(), 1024);

        let err = extractor
            .process("gone", Some("text".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, FilegateError::Processing(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_process_replacement_content() {
        let fx = setup(1024).await;
        store(&fx, "aa06", "pic.png", Some("image/png"), b"\x89PNG").await;

        // Replacement text bypasses blob type checks
        fx.extractor
            .process("aa06", Some("described image".to_string()))
            .await
            .unwrap();

        let record = fx.registry.get_by_id("aa06").await.unwrap().unwrap();
        assert_eq!(record.content(), Some("described image"));
    }

    #[tokio::test]
    async fn test_process_missing_record() {
        let fx = setup(1024).await;
        let err = fx.extractor.process("missing", None).await.unwrap_err();
        assert!(matches!(err, FilegateError::Processing(_)));
    }

    #[tokio::test]
    async fn test_process_record_without_path() {
        let fx = setup(1024).await;
        fx.registry
            .insert(&NewFile::new("virt", "u1", "v.txt", FileMeta::default()))
            .await
            .unwrap();

        assert!(fx.extractor.process("virt", None).await.is_err());
        fx.extractor
            .process("virt", Some("text".to_string()))
            .await
            .unwrap();
    }
}
