//! Test helpers for the file API integration tests.
//!
//! Provides a fully wired `TestApp` and collaborator wrappers whose
//! operations can be made to fail on demand.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use bytes::Bytes;
use serde_json::Value;
use tempfile::TempDir;

use filegate::file::{
    BlobStorage, ContentProcessor, FileRecord, FileRegistry, FileService, LocalStorage, NewFile,
    SqliteFileRegistry, StoredBlob, TextExtractor,
};
use filegate::web::handlers::AppState;
use filegate::web::middleware::{JwtClaims, JwtState};
use filegate::web::router::create_router;
use filegate::{Database, FilegateError, Result, Role};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Switches that make the wrapped collaborators fail.
#[derive(Default)]
pub struct Faults {
    pub registry_insert: AtomicBool,
    pub registry_get: AtomicBool,
    pub registry_delete: AtomicBool,
    pub registry_delete_all: AtomicBool,
    pub storage_upload: AtomicBool,
    pub storage_get: AtomicBool,
    pub storage_delete: AtomicBool,
    pub storage_delete_all: AtomicBool,
    pub processor: AtomicBool,
}

impl Faults {
    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn on(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

/// Registry wrapper with injectable failures.
pub struct FaultyRegistry {
    inner: SqliteFileRegistry,
    faults: Arc<Faults>,
}

#[async_trait]
impl FileRegistry for FaultyRegistry {
    async fn insert(&self, new_file: &NewFile) -> Result<FileRecord> {
        if Faults::on(&self.faults.registry_insert) {
            return Err(FilegateError::Persistence("insert refused".to_string()));
        }
        self.inner.insert(new_file).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
        if Faults::on(&self.faults.registry_get) {
            return Ok(None);
        }
        self.inner.get_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<FileRecord>> {
        self.inner.get_all().await
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<FileRecord>> {
        self.inner.get_by_user(user_id).await
    }

    async fn update_data(&self, id: &str, data: Value) -> Result<Option<FileRecord>> {
        self.inner.update_data(id, data).await
    }

    async fn update_hash(&self, id: &str, hash: &str) -> Result<Option<FileRecord>> {
        self.inner.update_hash(id, hash).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        if Faults::on(&self.faults.registry_delete) {
            return Err(FilegateError::Persistence("delete refused".to_string()));
        }
        self.inner.delete_by_id(id).await
    }

    async fn delete_all(&self) -> Result<bool> {
        if Faults::on(&self.faults.registry_delete_all) {
            return Ok(false);
        }
        self.inner.delete_all().await
    }
}

/// Storage wrapper with injectable failures.
pub struct FaultyStorage {
    inner: LocalStorage,
    faults: Arc<Faults>,
}

#[async_trait]
impl BlobStorage for FaultyStorage {
    async fn upload(&self, content: Bytes, key: &str) -> Result<StoredBlob> {
        if Faults::on(&self.faults.storage_upload) {
            return Err(FilegateError::Storage("disk full".to_string()));
        }
        self.inner.upload(content, key).await
    }

    async fn get_file(&self, path: &str) -> Result<PathBuf> {
        if Faults::on(&self.faults.storage_get) {
            return Err(FilegateError::Storage("backend unavailable".to_string()));
        }
        self.inner.get_file(path).await
    }

    async fn delete_file(&self, path: &str) -> Result<bool> {
        if Faults::on(&self.faults.storage_delete) {
            return Err(FilegateError::Storage("delete refused".to_string()));
        }
        self.inner.delete_file(path).await
    }

    async fn delete_all_files(&self) -> Result<()> {
        if Faults::on(&self.faults.storage_delete_all) {
            return Err(FilegateError::Storage("delete refused".to_string()));
        }
        self.inner.delete_all_files().await
    }
}

/// Processor wrapper with an injectable failure.
pub struct FaultyProcessor {
    inner: TextExtractor,
    faults: Arc<Faults>,
}

#[async_trait]
impl ContentProcessor for FaultyProcessor {
    async fn process(&self, file_id: &str, content: Option<String>) -> Result<()> {
        if Faults::on(&self.faults.processor) {
            return Err(FilegateError::Processing("extraction service down".to_string()));
        }
        self.inner.process(file_id, content).await
    }
}

/// A running test application.
pub struct TestApp {
    pub server: TestServer,
    pub faults: Arc<Faults>,
    pub registry: Arc<dyn FileRegistry>,
    pub storage: LocalStorage,
    jwt: JwtState,
    _db: Database,
    _dir: TempDir,
}

impl TestApp {
    /// Create an app with a 1MB upload limit.
    pub async fn new() -> Self {
        Self::with_upload_limit(1024 * 1024).await
    }

    /// Create an app with the given upload limit in bytes.
    pub async fn with_upload_limit(max_upload_size: u64) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let faults = Arc::new(Faults::default());

        let local = LocalStorage::new(dir.path().join("uploads")).expect("Failed to create storage");
        let registry: Arc<dyn FileRegistry> = Arc::new(FaultyRegistry {
            inner: SqliteFileRegistry::new(db.pool().clone()),
            faults: faults.clone(),
        });
        let storage: Arc<dyn BlobStorage> = Arc::new(FaultyStorage {
            inner: local.clone(),
            faults: faults.clone(),
        });
        let processor: Arc<dyn ContentProcessor> = Arc::new(FaultyProcessor {
            inner: TextExtractor::new(registry.clone(), storage.clone(), 1024 * 1024),
            faults: faults.clone(),
        });

        let files = FileService::new(registry.clone(), storage, processor);
        let app_state = Arc::new(AppState::new(files, max_upload_size));
        let jwt_state = Arc::new(JwtState::new(JWT_SECRET));

        let router = create_router(app_state, jwt_state, &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            faults,
            registry,
            storage: local,
            jwt: JwtState::new(JWT_SECRET),
            _db: db,
            _dir: dir,
        }
    }

    /// Bearer header value for a user with the given role.
    pub fn bearer(&self, user_id: &str, role: Role) -> String {
        let claims = JwtClaims::new(user_id, user_id, role, 3600);
        format!("Bearer {}", self.jwt.issue(&claims).expect("Failed to sign token"))
    }

    /// Upload `body` as `filename` on behalf of `user_id`.
    pub async fn upload(
        &self,
        user_id: &str,
        role: Role,
        filename: &str,
        mime: &str,
        body: &[u8],
    ) -> TestResponse {
        let part = Part::bytes(body.to_vec()).file_name(filename).mime_type(mime);
        let form = MultipartForm::new().add_part("file", part);

        self.server
            .post("/api/v1/files")
            .add_header(axum::http::header::AUTHORIZATION, self.bearer(user_id, role))
            .multipart(form)
            .await
    }

    /// Upload a text file and return its id.
    pub async fn upload_text(&self, user_id: &str, filename: &str, body: &str) -> String {
        let response = self
            .upload(user_id, Role::User, filename, "text/plain", body.as_bytes())
            .await;
        response.assert_status_ok();
        response.json::<Value>()["id"]
            .as_str()
            .expect("upload response has an id")
            .to_string()
    }
}
