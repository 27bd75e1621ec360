//! Per-user file upload, listing and download.
//!
//! Flow Overview:
//! 1) The bearer gate has already produced an [`Identity`].
//! 2) Uploads stream the `file` part into a freshly allocated blob, then
//!    record it; the blob is removed again if the record cannot be written.
//! 3) Downloads go through the ownership check before any bytes are read.

use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Extension, Multipart, Path,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use sanitize_filename::sanitize;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    api::error::{ApiError, ErrorBody},
    auth::{ownership::authorize_file, Identity},
    blobs::{BlobError, BlobStore},
    store::{DynStore, FileRecord, NewFile, Store, User},
};

pub const FILE_FIELD: &str = "file";
const FALLBACK_NAME: &str = "upload.bin";

/// Multipart body accepted by the upload endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct UploadResponse {
    pub message: String,
    pub id: i64,
    pub file_name: String,
    pub path: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct FileEntry {
    pub id: i64,
    pub file_name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileEntry {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.original_name,
            path: record.stored_path,
            created_at: record.created_at,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct FileList {
    pub total: usize,
    pub files: Vec<FileEntry>,
}

#[utoipa::path(
    post,
    path = "/user/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing file field or malformed multipart body", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 500, description = "Storage or database failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip_all)]
pub async fn upload(
    Extension(store): Extension<DynStore>,
    Extension(blobs): Extension<BlobStore>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let user = resolve_user(&*store, &identity).await?;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        // A `file` part without a filename is a plain form value, not an upload.
        if field.name() != Some(FILE_FIELD) || field.file_name().is_none() {
            continue;
        }

        let original_name = display_name(field.file_name());
        let stored_path = blobs.allocate(user.id);

        let size = match write_blob(&blobs, &stored_path, field).await {
            Ok(size) => size,
            Err(err) => {
                discard(&blobs, &stored_path).await;
                return Err(err);
            }
        };

        let new_file = NewFile {
            user_id: user.id,
            original_name: &original_name,
            stored_path: &stored_path,
        };
        let record = match store.create_file(new_file).await {
            Ok(record) => record,
            Err(err) => {
                discard(&blobs, &stored_path).await;
                return Err(err.into());
            }
        };

        info!(file_id = record.id, user_id = user.id, size, "File uploaded");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                message: "File uploaded successfully".to_string(),
                id: record.id,
                file_name: record.original_name,
                path: record.stored_path,
            }),
        ));
    }

    Err(ApiError::BadRequest(format!("missing '{FILE_FIELD}' field")))
}

#[utoipa::path(
    get,
    path = "/user/download",
    responses(
        (status = 200, description = "Files owned by the caller", body = FileList),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 500, description = "Database failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip_all)]
pub async fn list(
    Extension(store): Extension<DynStore>,
    identity: Identity,
) -> Result<Json<FileList>, ApiError> {
    let user = resolve_user(&*store, &identity).await?;
    let files: Vec<FileEntry> = store
        .list_files(user.id)
        .await?
        .into_iter()
        .map(FileEntry::from)
        .collect();

    Ok(Json(FileList {
        total: files.len(),
        files,
    }))
}

#[utoipa::path(
    get,
    path = "/user/download/{fileID}",
    params(("fileID" = i64, Path, description = "File id")),
    responses(
        (status = 200, description = "File content streamed as application/octet-stream"),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "File belongs to another user", body = ErrorBody),
        (status = 404, description = "No such file, or its content is missing", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip_all)]
pub async fn download(
    Extension(store): Extension<DynStore>,
    Extension(blobs): Extension<BlobStore>,
    identity: Identity,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let file_id = file_id
        .parse::<i64>()
        .map_err(|_| ApiError::NotFound("file not found"))?;

    let file = authorize_file(&*store, &blobs, &identity, file_id).await?;
    let disposition = content_disposition(&file.record.original_name);
    let body = Body::from_stream(ReaderStream::new(file.blob));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn resolve_user(store: &dyn Store, identity: &Identity) -> Result<User, ApiError> {
    store
        .find_user_by_email(&identity.email)
        .await?
        .ok_or_else(|| {
            warn!("Token subject does not resolve to a user");
            ApiError::Unauthorized("invalid token")
        })
}

async fn write_blob(
    blobs: &BlobStore,
    stored_path: &str,
    mut field: Field<'_>,
) -> Result<usize, ApiError> {
    let mut file = blobs.create(stored_path).await?;
    let mut written = 0;

    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        file.write_all(&chunk).await.map_err(BlobError::from)?;
        written += chunk.len();
    }
    file.flush().await.map_err(BlobError::from)?;

    Ok(written)
}

async fn discard(blobs: &BlobStore, stored_path: &str) {
    if let Err(err) = blobs.remove(stored_path).await {
        warn!("Failed to remove orphaned blob {stored_path}: {err}");
    }
}

fn malformed(err: MultipartError) -> ApiError {
    debug!("Rejecting multipart body: {err}");
    ApiError::BadRequest(err.body_text())
}

/// Client filenames are untrusted; keep a sanitized copy as metadata only.
fn display_name(file_name: Option<&str>) -> String {
    file_name
        .map(sanitize)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

fn content_disposition(file_name: &str) -> HeaderValue {
    let quoted: String = file_name
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{quoted}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_path_components() {
        assert_eq!(display_name(Some("notes.txt")), "notes.txt");
        assert!(!display_name(Some("../../etc/passwd")).contains('/'));
        assert_eq!(display_name(Some("")), FALLBACK_NAME);
        assert_eq!(display_name(None), FALLBACK_NAME);
    }

    #[test]
    fn content_disposition_quotes_safely() {
        let value = content_disposition("re\"port\\.pdf");
        assert_eq!(value, "attachment; filename=\"report.pdf\"");

        let value = content_disposition("résumé.pdf");
        assert_eq!(value, "attachment; filename=\"rsum.pdf\"");
    }
}
