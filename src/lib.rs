//! filegate - file upload and retrieval service.
//!
//! An HTTP layer over three collaborators: a metadata registry, a blob
//! storage and a content processor. Each one is reached through a trait so
//! that backends can be swapped without touching the request handlers.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{can_access_record, check_permission, Caller, PermissionError, Role};
pub use config::Config;
pub use db::Database;
pub use error::{FilegateError, Result};
pub use file::{
    BlobStorage, ContentProcessor, FileRecord, FileRegistry, FileService, LocalStorage,
    SqliteFileRegistry, TextExtractor,
};
