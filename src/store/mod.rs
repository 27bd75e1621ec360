//! Persistence for users and file records.
//!
//! Handlers receive an `Arc<dyn Store>` so the Postgres store can be swapped
//! for [`MemoryStore`] in tests. Uniqueness of emails is enforced by the store
//! itself; a losing concurrent insert surfaces as [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DynStore = Arc<dyn Store>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub user_id: i64,
    pub original_name: String,
    /// Relative to the uploads root; always server-generated.
    pub stored_path: String,
    pub created_at: DateTime<Utc>,
}

/// A file record joined with its owner's email.
#[derive(Clone, Debug)]
pub struct OwnedFile {
    pub record: FileRecord,
    pub owner_email: String,
}

#[derive(Clone, Copy, Debug)]
pub struct NewFile<'a> {
    pub user_id: i64,
    pub original_name: &'a str,
    pub stored_path: &'a str,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a user. Returns [`StoreError::Conflict`] if the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_file(&self, file: NewFile<'_>) -> Result<FileRecord, StoreError>;

    /// Files owned by `user_id`, oldest first.
    async fn list_files(&self, user_id: i64) -> Result<Vec<FileRecord>, StoreError>;

    async fn find_file(&self, file_id: i64) -> Result<Option<OwnedFile>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
