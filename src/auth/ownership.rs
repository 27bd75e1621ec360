//! Ownership checks for file access.
//!
//! Per request: `Authenticated -> (ownership check) -> Authorized | Forbidden`.
//! A missing record and a record whose blob is gone are both `404`; a record
//! owned by someone else is `403`.

use tokio::fs::File;
use tracing::warn;

use super::gate::Identity;
use crate::{
    api::error::ApiError,
    blobs::BlobStore,
    store::{FileRecord, OwnedFile, Store},
};

/// A file record the caller may read, with its blob already opened.
#[derive(Debug)]
pub struct AuthorizedFile {
    pub record: FileRecord,
    pub blob: File,
}

/// Decide access to an already resolved record.
///
/// # Errors
/// Returns `403` when the record belongs to another user.
pub fn check_owner(owned: &OwnedFile, identity: &Identity) -> Result<(), ApiError> {
    if owned.owner_email == identity.email {
        Ok(())
    } else {
        warn!(
            file_id = owned.record.id,
            "Denied file access to a non-owner"
        );
        Err(ApiError::Forbidden("you do not own this file"))
    }
}

/// Resolve `file_id`, verify the caller owns it and open its blob.
///
/// # Errors
/// `404` if the record or its blob is missing, `403` if not owned by the
/// caller, `500` on storage failures.
pub async fn authorize_file(
    store: &dyn Store,
    blobs: &BlobStore,
    identity: &Identity,
    file_id: i64,
) -> Result<AuthorizedFile, ApiError> {
    let owned = store
        .find_file(file_id)
        .await?
        .ok_or(ApiError::NotFound("file not found"))?;

    check_owner(&owned, identity)?;

    let Some(blob) = blobs.open_read(&owned.record.stored_path).await? else {
        warn!(
            file_id,
            stored_path = %owned.record.stored_path,
            "File record exists but its blob is missing"
        );
        return Err(ApiError::NotFound("file not found on server"));
    };

    Ok(AuthorizedFile {
        record: owned.record,
        blob,
    })
}
