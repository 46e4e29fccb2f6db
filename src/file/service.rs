//! File service for filegate.
//!
//! This module ties the registry, blob storage and content processor
//! together. Handlers talk to `FileService` only and never name a concrete
//! backend.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::processor::ContentProcessor;
use super::record::{FileMeta, FileRecord, NewFile};
use super::registry::FileRegistry;
use super::sanitize_filename;
use super::storage::BlobStorage;
use crate::auth::{can_access_record, Caller};
use crate::{FilegateError, Result};

/// Result of an upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The record as currently stored.
    pub record: FileRecord,
    /// Processing failure, if the processor rejected the file.
    ///
    /// The upload itself still succeeded.
    pub error: Option<String>,
}

/// Orchestrates the file collaborators.
#[derive(Clone)]
pub struct FileService {
    registry: Arc<dyn FileRegistry>,
    storage: Arc<dyn BlobStorage>,
    processor: Arc<dyn ContentProcessor>,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(
        registry: Arc<dyn FileRegistry>,
        storage: Arc<dyn BlobStorage>,
        processor: Arc<dyn ContentProcessor>,
    ) -> Self {
        Self {
            registry,
            storage,
            processor,
        }
    }

    /// Upload a file on behalf of `caller`.
    ///
    /// # Errors
    /// - `Validation` if the filename is unusable
    /// - `Storage` if the bytes could not be written (no record is created)
    /// - `Persistence` if the record could not be inserted (the blob stays)
    /// - `NotFound` if the record disappeared before it could be returned
    ///
    /// A processor failure is not an error; it is reported in
    /// `UploadOutcome::error`.
    pub async fn upload(
        &self,
        caller: &Caller,
        declared_name: &str,
        content_type: Option<String>,
        content: Bytes,
    ) -> Result<UploadOutcome> {
        let name = sanitize_filename(declared_name)?;
        let id = Uuid::new_v4().to_string();
        let key = format!("{id}_{name}");

        let blob = self.storage.upload(content, &key).await?;

        let meta = FileMeta::new(&name, content_type, blob.size);
        let new_file = NewFile::new(&id, &caller.id, &name, meta).with_path(&blob.path);
        let inserted = self.registry.insert(&new_file).await.map_err(|e| {
            error!(file_id = %id, path = %blob.path, "record insert failed, blob left behind: {e}");
            e
        })?;

        info!(file_id = %id, user_id = %caller.id, size = blob.size, "file uploaded");

        match self.processor.process(&id, None).await {
            Ok(()) => {
                let record = self
                    .registry
                    .get_by_id(&id)
                    .await?
                    .ok_or_else(|| FilegateError::NotFound(format!("file {id}")))?;
                Ok(UploadOutcome {
                    record,
                    error: None,
                })
            }
            Err(e) => {
                warn!(file_id = %id, "processing failed: {e}");
                let record = self.registry.get_by_id(&id).await?.unwrap_or(inserted);
                Ok(UploadOutcome {
                    record,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Records visible to `caller`: everything for admins, own records otherwise.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<FileRecord>> {
        if caller.is_admin() {
            self.registry.get_all().await
        } else {
            self.registry.get_by_user(&caller.id).await
        }
    }

    /// Delete every record, then every blob.
    ///
    /// Blobs are only touched once the registry reports success.
    /// Admin checks are the caller's responsibility.
    pub async fn delete_all(&self) -> Result<()> {
        if !self.registry.delete_all().await? {
            return Err(FilegateError::Persistence(
                "registry reported nothing deleted".to_string(),
            ));
        }
        self.storage.delete_all_files().await?;
        info!("all files deleted");
        Ok(())
    }

    /// Fetch a record the caller may access.
    ///
    /// Missing and forbidden records are indistinguishable: both are
    /// `NotFound`.
    pub async fn get_authorized(&self, caller: &Caller, id: &str) -> Result<FileRecord> {
        match self.registry.get_by_id(id).await? {
            Some(record) if can_access_record(&record.user_id, caller) => Ok(record),
            Some(_) => {
                warn!(file_id = %id, user_id = %caller.id, "access to foreign file denied");
                Err(FilegateError::NotFound("file".to_string()))
            }
            None => Err(FilegateError::NotFound("file".to_string())),
        }
    }

    /// Resolve the local path of a record's blob.
    ///
    /// Returns `Ok(None)` for records without a blob.
    pub async fn local_path(&self, record: &FileRecord) -> Result<Option<PathBuf>> {
        match record.path.as_deref() {
            Some(path) => Ok(Some(self.storage.get_file(path).await?)),
            None => Ok(None),
        }
    }

    /// Replace a record's content and re-run the processor.
    ///
    /// Processor failures are logged and the currently stored content is
    /// returned.
    pub async fn update_content(&self, caller: &Caller, id: &str, content: String) -> Result<String> {
        self.get_authorized(caller, id).await?;

        if let Err(e) = self.processor.process(id, Some(content)).await {
            warn!(file_id = %id, "content update processing failed: {e}");
        }

        let record = self
            .registry
            .get_by_id(id)
            .await?
            .ok_or_else(|| FilegateError::NotFound("file".to_string()))?;
        Ok(record.content().unwrap_or_default().to_string())
    }

    /// Delete one record and its blob.
    ///
    /// # Errors
    /// - `NotFound` if the caller may not see the record
    /// - `Persistence` if the registry delete failed or removed nothing
    /// - `Storage` if the record is gone but the blob could not be removed
    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<()> {
        let record = self.get_authorized(caller, id).await?;

        if !self.registry.delete_by_id(id).await? {
            return Err(FilegateError::Persistence(format!(
                "file {id} was not deleted"
            )));
        }

        if let Some(path) = record.path.as_deref() {
            if !self.storage.delete_file(path).await? {
                warn!(file_id = %id, %path, "blob already absent");
            }
        }

        info!(file_id = %id, user_id = %caller.id, "file deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::Database;
    use crate::file::{LocalStorage, SqliteFileRegistry, TextExtractor};
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        _db: Database,
        service: FileService,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let registry: Arc<dyn FileRegistry> = Arc::new(SqliteFileRegistry::new(db.pool().clone()));
        let storage: Arc<dyn BlobStorage> = Arc::new(LocalStorage::new(temp_dir.path()).unwrap());
        let processor: Arc<dyn ContentProcessor> =
            Arc::new(TextExtractor::new(registry.clone(), storage.clone(), 1024 * 1024));
        Fixture {
            _temp_dir: temp_dir,
            _db: db,
            service: FileService::new(registry, storage, processor),
        }
    }

    fn alice() -> Caller {
        Caller::new("alice", Role::User)
    }

    fn bob() -> Caller {
        Caller::new("bob", Role::User)
    }

    fn admin() -> Caller {
        Caller::new("root", Role::Admin)
    }

    async fn upload_text(fx: &Fixture, caller: &Caller, name: &str, body: &'static str) -> UploadOutcome {
        fx.service
            .upload(caller, name, Some("text/plain".to_string()), Bytes::from_static(body.as_bytes()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_success() {
        let fx = setup().await;
        let outcome = upload_text(&fx, &alice(), "hello.txt", "hello").await;

        assert!(outcome.error.is_none());
        let record = outcome.record;
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.filename, "hello.txt");
        assert_eq!(record.meta.name, "hello.txt");
        assert_eq!(record.meta.size, 5);
        assert_eq!(record.content(), Some("hello"));
        assert!(record.hash.is_some());
        assert!(record
            .path
            .as_deref()
            .unwrap()
            .ends_with(&format!("{}_hello.txt", record.id)));
    }

    #[tokio::test]
    async fn test_upload_sanitizes_traversal() {
        let fx = setup().await;
        let outcome = upload_text(&fx, &alice(), "../../etc/passwd", "root:x").await;

        assert_eq!(outcome.record.filename, "passwd");
        assert_ne!(outcome.record.id, "passwd");
        let path = outcome.record.path.unwrap();
        assert!(path.ends_with(&format!("{}_passwd", outcome.record.id)));
        assert!(!path.contains(".."));
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_name() {
        let fx = setup().await;
        let result = fx
            .service
            .upload(&alice(), "..", None, Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(FilegateError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_same_name_twice() {
        let fx = setup().await;
        let a = upload_text(&fx, &alice(), "same.txt", "1").await.record;
        let b = upload_text(&fx, &alice(), "same.txt", "2").await.record;

        assert_ne!(a.id, b.id);
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_upload_processing_failure_is_annotated() {
        let fx = setup().await;
        let outcome = fx
            .service
            .upload(&alice(), "pic.png", Some("image/png".to_string()), Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();

        let error = outcome.error.unwrap();
        assert!(error.contains("unsupported file type"));
        assert_eq!(outcome.record.content(), None);

        // Stored record is still retrievable
        fx.service
            .get_authorized(&alice(), &outcome.record.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_scoping() {
        let fx = setup().await;
        upload_text(&fx, &alice(), "a.txt", "a").await;
        upload_text(&fx, &bob(), "b.txt", "b").await;

        assert_eq!(fx.service.list(&alice()).await.unwrap().len(), 1);
        assert_eq!(fx.service.list(&bob()).await.unwrap().len(), 1);
        assert_eq!(fx.service.list(&admin()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_authorized() {
        let fx = setup().await;
        let id = upload_text(&fx, &alice(), "a.txt", "a").await.record.id;

        assert!(fx.service.get_authorized(&alice(), &id).await.is_ok());
        assert!(fx.service.get_authorized(&admin(), &id).await.is_ok());
        assert!(matches!(
            fx.service.get_authorized(&bob(), &id).await,
            Err(FilegateError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.get_authorized(&alice(), "missing").await,
            Err(FilegateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_content() {
        let fx = setup().await;
        let id = upload_text(&fx, &alice(), "a.txt", "old").await.record.id;

        let content = fx
            .service
            .update_content(&alice(), &id, "new".to_string())
            .await
            .unwrap();
        assert_eq!(content, "new");

        assert!(fx
            .service
            .update_content(&bob(), &id, "hijack".to_string())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let fx = setup().await;
        let record = upload_text(&fx, &alice(), "a.txt", "a").await.record;
        let local = fx.service.local_path(&record).await.unwrap().unwrap();
        assert!(local.exists());

        assert!(matches!(
            fx.service.delete(&bob(), &record.id).await,
            Err(FilegateError::NotFound(_))
        ));

        fx.service.delete(&alice(), &record.id).await.unwrap();
        assert!(!local.exists());
        assert!(fx.service.get_authorized(&alice(), &record.id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let fx = setup().await;
        let record = upload_text(&fx, &alice(), "a.txt", "a").await.record;
        upload_text(&fx, &bob(), "b.txt", "b").await;
        let local = fx.service.local_path(&record).await.unwrap().unwrap();

        fx.service.delete_all().await.unwrap();
        assert!(fx.service.list(&admin()).await.unwrap().is_empty());
        assert!(!local.exists());

        // Empty registry still succeeds
        fx.service.delete_all().await.unwrap();
    }
}
