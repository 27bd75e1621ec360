use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool};
use tracing::{info_span, Instrument};

use super::{FileRecord, NewFile, OwnedFile, Store, StoreError, User};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OwnedFileRow {
    id: i64,
    user_id: i64,
    original_name: String,
    stored_path: String,
    created_at: DateTime<Utc>,
    owner_email: String,
}

impl From<OwnedFileRow> for OwnedFile {
    fn from(row: OwnedFileRow) -> Self {
        Self {
            record: FileRecord {
                id: row.id,
                user_id: row.user_id,
                original_name: row.original_name,
                stored_path: row.stored_path,
                created_at: row.created_at,
            },
            owner_email: row.owner_email,
        }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn conflict_or_database(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let query = "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
                     RETURNING id, email, password_hash, created_at";
        sqlx::query_as::<_, User>(query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(conflict_or_database)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = "SELECT id, email, password_hash, created_at FROM users WHERE email = $1";
        Ok(sqlx::query_as::<_, User>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?)
    }

    async fn create_file(&self, file: NewFile<'_>) -> Result<FileRecord, StoreError> {
        let query = "INSERT INTO files (user_id, original_name, stored_path) VALUES ($1, $2, $3) \
                     RETURNING id, user_id, original_name, stored_path, created_at";
        sqlx::query_as::<_, FileRecord>(query)
            .bind(file.user_id)
            .bind(file.original_name)
            .bind(file.stored_path)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(conflict_or_database)
    }

    async fn list_files(&self, user_id: i64) -> Result<Vec<FileRecord>, StoreError> {
        let query = "SELECT id, user_id, original_name, stored_path, created_at \
                     FROM files WHERE user_id = $1 ORDER BY id";
        Ok(sqlx::query_as::<_, FileRecord>(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?)
    }

    async fn find_file(&self, file_id: i64) -> Result<Option<OwnedFile>, StoreError> {
        let query = "SELECT f.id, f.user_id, f.original_name, f.stored_path, f.created_at, \
                     u.email AS owner_email \
                     FROM files f JOIN users u ON u.id = f.user_id WHERE f.id = $1";
        let row = sqlx::query_as::<_, OwnedFileRow>(query)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.map(OwnedFile::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
