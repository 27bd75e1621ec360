use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{FileRecord, NewFile, OwnedFile, Store, StoreError, User};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    files: Vec<FileRecord>,
}

/// In-process [`Store`] used as a test double.
///
/// All tables sit behind one mutex, so the email uniqueness check and the
/// insert happen atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).map_or(i64::MAX, |len| len + 1)
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|user| user.email == email) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: next_id(tables.users.len()),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn create_file(&self, file: NewFile<'_>) -> Result<FileRecord, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables
            .files
            .iter()
            .any(|record| record.stored_path == file.stored_path)
        {
            return Err(StoreError::Conflict);
        }
        let record = FileRecord {
            id: next_id(tables.files.len()),
            user_id: file.user_id,
            original_name: file.original_name.to_string(),
            stored_path: file.stored_path.to_string(),
            created_at: Utc::now(),
        };
        tables.files.push(record.clone());
        Ok(record)
    }

    async fn list_files(&self, user_id: i64) -> Result<Vec<FileRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .files
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_file(&self, file_id: i64) -> Result<Option<OwnedFile>, StoreError> {
        let tables = self.tables.lock().await;
        let Some(record) = tables.files.iter().find(|record| record.id == file_id) else {
            return Ok(None);
        };
        Ok(tables
            .users
            .iter()
            .find(|user| user.id == record.user_id)
            .map(|owner| OwnedFile {
                record: record.clone(),
                owner_email: owner.email.clone(),
            }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user("a@x.com", "hash").await.unwrap();

        assert!(matches!(
            store.create_user("a@x.com", "other").await,
            Err(StoreError::Conflict)
        ));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn email_is_case_sensitive() {
        let store = MemoryStore::new();
        store.create_user("a@x.com", "hash").await.unwrap();
        store.create_user("A@x.com", "hash").await.unwrap();

        assert_eq!(store.user_count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_registrations_produce_one_user() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_user("race@x.com", "hash").await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(StoreError::Conflict) => conflicts += 1,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn find_file_joins_owner_email() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "hash").await.unwrap();
        let record = store
            .create_file(NewFile {
                user_id: user.id,
                original_name: "notes.txt",
                stored_path: "1/abc",
            })
            .await
            .unwrap();

        let owned = store.find_file(record.id).await.unwrap().unwrap();
        assert_eq!(owned.owner_email, "a@x.com");
        assert_eq!(owned.record.original_name, "notes.txt");
        assert!(store.find_file(record.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_files_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let alice = store.create_user("a@x.com", "hash").await.unwrap();
        let bob = store.create_user("b@x.com", "hash").await.unwrap();
        for (user_id, path) in [(alice.id, "1/a"), (bob.id, "2/b"), (alice.id, "1/c")] {
            store
                .create_file(NewFile {
                    user_id,
                    original_name: "f",
                    stored_path: path,
                })
                .await
                .unwrap();
        }

        let files = store.list_files(alice.id).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|record| record.user_id == alice.id));
    }
}
