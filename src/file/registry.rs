//! File record registry.
//!
//! `FileRegistry` is the capability the service layer depends on;
//! `SqliteFileRegistry` is the default backend over an sqlx pool.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use super::record::{FileMeta, FileRecord, NewFile};
use crate::db::DbPool;
use crate::Result;

/// Persistent store of file records keyed by id.
#[async_trait]
pub trait FileRegistry: Send + Sync {
    /// Insert a new record and return it as stored.
    async fn insert(&self, new_file: &NewFile) -> Result<FileRecord>;

    /// Get a record by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<FileRecord>>;

    /// All records, newest first.
    async fn get_all(&self) -> Result<Vec<FileRecord>>;

    /// Records owned by `user_id`, newest first.
    async fn get_by_user(&self, user_id: &str) -> Result<Vec<FileRecord>>;

    /// Merge `data` (a JSON object) into the record's data.
    ///
    /// Returns the updated record, or None if it does not exist.
    async fn update_data(&self, id: &str, data: Value) -> Result<Option<FileRecord>>;

    /// Set the content hash.
    async fn update_hash(&self, id: &str, hash: &str) -> Result<Option<FileRecord>>;

    /// Delete a record. Returns false if nothing was deleted.
    async fn delete_by_id(&self, id: &str) -> Result<bool>;

    /// Delete every record.
    async fn delete_all(&self) -> Result<bool>;
}

/// SQLite implementation of `FileRegistry`.
#[derive(Debug, Clone)]
pub struct SqliteFileRegistry {
    pool: DbPool,
}

impl SqliteFileRegistry {
    /// Create a new registry over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, hash, filename, path, data, meta, created_at, updated_at FROM files";

#[async_trait]
impl FileRegistry for SqliteFileRegistry {
    async fn insert(&self, new_file: &NewFile) -> Result<FileRecord> {
        let now = Utc::now().timestamp();
        let meta = serde_json::to_string(&new_file.meta)?;

        sqlx::query(
            "INSERT INTO files (id, user_id, hash, filename, path, data, meta, created_at, updated_at)
             VALUES (?, ?, NULL, ?, ?, '{}', ?, ?, ?)",
        )
        .bind(&new_file.id)
        .bind(&new_file.user_id)
        .bind(&new_file.filename)
        .bind(&new_file.path)
        .bind(&meta)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(FileRecord {
            id: new_file.id.clone(),
            user_id: new_file.user_id.clone(),
            hash: None,
            filename: new_file.filename.clone(),
            path: new_file.path.clone(),
            data: Value::Object(Map::new()),
            meta: new_file.meta.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
        let row: Option<FileRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(FileRow::into_record).transpose()
    }

    async fn get_all(&self) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(FileRow::into_record).collect()
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FileRow::into_record).collect()
    }

    async fn update_data(&self, id: &str, data: Value) -> Result<Option<FileRecord>> {
        let Some(record) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let mut merged = match record.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match data {
            Value::Object(map) => merged.extend(map),
            other => {
                merged.insert("content".to_string(), other);
            }
        }

        sqlx::query("UPDATE files SET data = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&Value::Object(merged))?)
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_by_id(id).await
    }

    async fn update_hash(&self, id: &str, hash: &str) -> Result<Option<FileRecord>> {
        let result = sqlx::query("UPDATE files SET hash = ?, updated_at = ? WHERE id = ?")
            .bind(hash)
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<bool> {
        sqlx::query("DELETE FROM files").execute(&self.pool).await?;
        Ok(true)
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    user_id: String,
    hash: Option<String>,
    filename: String,
    path: Option<String>,
    data: String,
    meta: String,
    created_at: i64,
    updated_at: i64,
}

impl FileRow {
    fn into_record(self) -> Result<FileRecord> {
        let data: Value = serde_json::from_str(&self.data)?;
        let meta: FileMeta = serde_json::from_str(&self.meta)?;

        Ok(FileRecord {
            id: self.id,
            user_id: self.user_id,
            hash: self.hash,
            filename: self.filename,
            path: self.path,
            data,
            meta,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
