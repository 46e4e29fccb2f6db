//! API handlers for the file routes.

pub mod files;

pub use files::*;

use crate::file::FileService;

/// Shared state for the file handlers.
#[derive(Clone)]
pub struct AppState {
    /// File orchestration service.
    pub files: FileService,
    /// Maximum accepted upload size in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileService, max_upload_size: u64) -> Self {
        Self {
            files,
            max_upload_size,
        }
    }
}
