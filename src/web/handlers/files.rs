//! File handlers for Web API.
//!
//! Every `{id}` route resolves the record through
//! `FileService::get_authorized`, so a record the caller may not see is
//! reported exactly like a missing one.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::FileRecord;
use crate::web::dto::{
    ContentForm, ContentResponse, FileModelResponse, FileResponse, MessageResponse, UploadForm,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AdminUser, VerifiedUser};
use crate::FilegateError;

/// Generate a safe Content-Disposition header value.
///
/// Control characters are dropped, quotes and backslashes replaced, and
/// non-ASCII names get an RFC 5987 `filename*` parameter.
fn content_disposition_header(disposition: &str, filename: &str) -> String {
    let needs_escaping = filename.chars().any(|c| c.is_control() || c == '"' || c == '\\');

    if filename.is_ascii() && !needs_escaping {
        return format!("{disposition}; filename=\"{filename}\"");
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!("{disposition}; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

/// Content type for a record: the declared one, else a guess from its name.
fn content_type_for(record: &FileRecord) -> String {
    record
        .meta
        .content_type
        .clone()
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(record.display_name())
                .first_or_octet_stream()
                .to_string()
        })
}

/// Stream a local file as the response body.
async fn stream_file(
    local: &FsPath,
    content_type: &str,
    disposition: Option<String>,
) -> Result<Response<Body>, ApiError> {
    let file = match tokio::fs::File::open(local).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %local.display(), "stored file missing");
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => {
            tracing::error!(path = %local.display(), "Failed to open file: {}", e);
            return Err(ApiError::bad_request("Error getting file content"));
        }
    };
    let length = file
        .metadata()
        .await
        .map_err(|e| {
            tracing::error!(path = %local.display(), "Failed to stat file: {}", e);
            ApiError::bad_request("Error getting file content")
        })?
        .len();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length);
    if let Some(disposition) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// Resolve a record's blob to a local path, mapping failures to API errors.
async fn resolve_local(state: &AppState, record: &FileRecord) -> Result<std::path::PathBuf, ApiError> {
    match state.files.local_path(record).await {
        Ok(Some(path)) => Ok(path),
        Ok(None) => Err(ApiError::not_found("File not found")),
        Err(e) => {
            tracing::error!(file_id = %record.id, "Failed to resolve file path: {}", e);
            Err(ApiError::bad_request("Error getting file content"))
        }
    }
}

fn not_found_or_internal(e: FilegateError) -> ApiError {
    match e {
        FilegateError::NotFound(_) => ApiError::not_found("File not found"),
        other => ApiError::from(other),
    }
}

/// POST /api/v1/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field.
#[utoipa::path(
    post,
    path = "/api/v1/files",
    tag = "files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded; `error` is set if processing failed", body = FileResponse),
        (status = 400, description = "Invalid filename, missing file or file too large"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Storage or registry failure")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, ApiError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let content = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file content: {}", e);
            ApiError::bad_request("Failed to read file")
        })?;
        upload = Some((filename, content_type, content));
    }

    let (filename, content_type, content) =
        upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    if content.len() as u64 > state.max_upload_size {
        let max_mb = state.max_upload_size / 1024 / 1024;
        return Err(ApiError::bad_request(format!(
            "File too large (max {}MB)",
            max_mb
        )));
    }

    let outcome = state
        .files
        .upload(&caller, &filename, content_type, content)
        .await
        .map_err(|e| match e {
            FilegateError::Validation(msg) => ApiError::bad_request(msg),
            FilegateError::NotFound(_) => ApiError::bad_request("Error uploading file"),
            other => {
                tracing::error!(user_id = %caller.id, "Upload failed: {}", other);
                ApiError::internal("Error uploading file")
            }
        })?;

    Ok(Json(FileResponse::from(outcome)))
}

/// GET /api/v1/files - List files visible to the caller.
#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "files",
    responses(
        (status = 200, description = "Own files, or every file for admins", body = Vec<FileResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let records = state.files.list(&caller).await?;
    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

/// DELETE /api/v1/files/all - Delete every file (admin only).
#[utoipa::path(
    delete,
    path = "/api/v1/files/all",
    tag = "files",
    responses(
        (status = 200, description = "All files deleted", body = MessageResponse),
        (status = 400, description = "Registry or storage failure"),
        (status = 401, description = "Not an administrator")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_all_files(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.files.delete_all().await.map_err(|e| {
        tracing::error!(user_id = %admin.id, "Delete all failed: {}", e);
        match e {
            FilegateError::Storage(_) => {
                ApiError::bad_request("Error deleting files: records removed but stored files were not")
            }
            _ => ApiError::bad_request("Error deleting files"),
        }
    })?;

    Ok(Json(MessageResponse::new("All files deleted successfully")))
}

/// GET /api/v1/files/:id - Get a file record.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File record", body = FileModelResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path(id): Path<String>,
) -> Result<Json<FileModelResponse>, ApiError> {
    let record = state
        .files
        .get_authorized(&caller, &id)
        .await
        .map_err(not_found_or_internal)?;
    Ok(Json(FileModelResponse::from(record)))
}

/// GET /api/v1/files/:id/data/content - Get extracted text.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/data/content",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Extracted text", body = ContentResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_data_content(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path(id): Path<String>,
) -> Result<Json<ContentResponse>, ApiError> {
    let record = state
        .files
        .get_authorized(&caller, &id)
        .await
        .map_err(not_found_or_internal)?;

    Ok(Json(ContentResponse {
        content: record.content().unwrap_or_default().to_string(),
    }))
}

/// POST /api/v1/files/:id/data/content/update - Replace extracted text.
#[utoipa::path(
    post,
    path = "/api/v1/files/{id}/data/content/update",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    request_body = ContentForm,
    responses(
        (status = 200, description = "Content now stored", body = ContentResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_file_data_content(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path(id): Path<String>,
    Json(form): Json<ContentForm>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state
        .files
        .update_content(&caller, &id, form.content)
        .await
        .map_err(not_found_or_internal)?;

    Ok(Json(ContentResponse { content }))
}

/// GET /api/v1/files/:id/content - Download the original file.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/content",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "Storage path could not be resolved"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_content(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path(id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let record = state
        .files
        .get_authorized(&caller, &id)
        .await
        .map_err(not_found_or_internal)?;

    download_blob(&state, &record).await
}

/// GET /api/v1/files/:id/content/html - Render the original file inline.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/content/html",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content, inline"),
        (status = 400, description = "Storage path could not be resolved"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_html_file_content(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path(id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let record = state
        .files
        .get_authorized(&caller, &id)
        .await
        .map_err(not_found_or_internal)?;

    let local = resolve_local(&state, &record).await?;
    let content_type = mime_guess::from_path(record.display_name())
        .first_or_octet_stream()
        .to_string();

    stream_file(&local, &content_type, None).await
}

/// GET /api/v1/files/:id/content/:file_name - Download by name.
///
/// Records without a blob fall back to their extracted text.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/content/{file_name}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID"),
        ("file_name" = String, Path, description = "Any name; only used by clients")
    ),
    responses(
        (status = 200, description = "File content or extracted text"),
        (status = 400, description = "Storage path could not be resolved"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_content_by_name(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path((id, _file_name)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let record = state
        .files
        .get_authorized(&caller, &id)
        .await
        .map_err(not_found_or_internal)?;

    if record.path.is_some() {
        return download_blob(&state, &record).await;
    }

    let text = record.content().unwrap_or_default().to_string();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header("attachment", &record.filename),
        )
        .header(header::CONTENT_LENGTH, text.len())
        .body(Body::from(text))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

async fn download_blob(state: &AppState, record: &FileRecord) -> Result<Response<Body>, ApiError> {
    let local = resolve_local(state, record).await?;
    let disposition = content_disposition_header("attachment", record.display_name());
    stream_file(&local, &content_type_for(record), Some(disposition)).await
}

/// DELETE /api/v1/files/:id - Delete a file.
#[utoipa::path(
    delete,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Registry or storage failure"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    VerifiedUser(caller): VerifiedUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.files.delete(&caller, &id).await.map_err(|e| match e {
        FilegateError::NotFound(_) => ApiError::not_found("File not found"),
        FilegateError::Storage(msg) => {
            tracing::error!(file_id = %id, "Blob delete failed: {}", msg);
            ApiError::bad_request("Error deleting file: record removed but stored content was not")
        }
        other => {
            tracing::error!(file_id = %id, "Delete failed: {}", other);
            ApiError::bad_request("Error deleting file")
        }
    })?;

    Ok(Json(MessageResponse::new("File deleted successfully")))
}
