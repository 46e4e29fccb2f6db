//! File management module for filegate.
//!
//! This module provides the file record model, the three collaborator
//! traits and their default implementations:
//! - `FileRegistry` / `SqliteFileRegistry`: metadata records
//! - `BlobStorage` / `LocalStorage`: raw bytes on disk
//! - `ContentProcessor` / `TextExtractor`: derived text content
//!
//! `FileService` ties them together for the HTTP handlers.

mod processor;
mod record;
mod registry;
mod service;
mod storage;

pub use processor::{ContentProcessor, TextExtractor};
pub use record::{FileMeta, FileRecord, NewFile};
pub use registry::{FileRegistry, SqliteFileRegistry};
pub use service::{FileService, UploadOutcome};
pub use storage::{BlobStorage, LocalStorage, StoredBlob};

use crate::{FilegateError, Result};

/// Maximum length for a filename, in UTF-8 bytes.
///
/// Blobs are stored under `{uuid}_{name}`, a single path component that
/// must fit in the 255 byte `NAME_MAX` of common filesystems.
pub const MAX_FILENAME_BYTES: usize = 255 - 37;

/// Strip directory components from a client supplied filename.
///
/// Both `/` and `\` count as separators regardless of platform, so
/// `..\..\boot.ini` and `../../etc/passwd` reduce to their last segment.
///
/// # Examples
///
/// ```
/// use filegate::file::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
/// assert!(sanitize_filename("..").is_err());
/// ```
pub fn sanitize_filename(raw: &str) -> Result<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(FilegateError::Validation(format!(
            "invalid filename: {raw:?}"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(FilegateError::Validation(
            "filename contains control characters".to_string(),
        ));
    }
    if name.len() > MAX_FILENAME_BYTES {
        return Err(FilegateError::Validation(format!(
            "filename must be at most {MAX_FILENAME_BYTES} bytes"
        )));
    }

    Ok(name.to_string())
}
