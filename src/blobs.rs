//! Filesystem blob storage under the uploads root.
//!
//! Stored paths are `<user id>/<uuid>` relative to the root and are generated
//! here, never taken from client input. Files are created with create-new
//! semantics so two writers can never clobber the same blob.

use std::{
    io,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob io error: {0}")]
    Io(#[from] io::Error),
    #[error("stored path escapes the uploads root: {0}")]
    InvalidPath(String),
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Use `root` as the uploads directory, creating it if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh, unguessable stored path for `user_id`.
    #[must_use]
    pub fn allocate(&self, user_id: i64) -> String {
        format!("{user_id}/{}", Uuid::new_v4())
    }

    /// Create a new blob for writing. Fails if the path already exists.
    ///
    /// # Errors
    /// Returns an error if the path is invalid, already exists, or cannot be created.
    pub async fn create(&self, stored_path: &str) -> Result<File, BlobError> {
        let path = self.resolve(stored_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(file)
    }

    /// Open a blob for reading, or `None` if it is missing on disk.
    ///
    /// # Errors
    /// Returns an error for invalid paths or io failures other than not-found.
    pub async fn open_read(&self, stored_path: &str) -> Result<Option<File>, BlobError> {
        let path = self.resolve(stored_path)?;
        match File::open(&path).await {
            Ok(file) => Ok(Some(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a blob; a missing file is not an error.
    ///
    /// # Errors
    /// Returns an error for invalid paths or io failures other than not-found.
    pub async fn remove(&self, stored_path: &str) -> Result<(), BlobError> {
        let path = self.resolve(stored_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(stored_path);
        let only_normal = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if stored_path.is_empty() || !only_normal {
            return Err(BlobError::InvalidPath(stored_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}
