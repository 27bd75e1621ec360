use thiserror::Error;
use tokio::task;
use tracing::warn;

/// bcrypt only consumes the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// Salted bcrypt hashing with a fixed work factor.
///
/// Both operations run on the blocking pool so a slow hash never stalls the
/// async workers.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    #[must_use]
    pub const fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash `plain` with a fresh random salt embedded in the returned digest.
    ///
    /// # Errors
    /// Returns an error if bcrypt fails; callers must not fall back to a weaker scheme.
    pub async fn hash(&self, plain: &str) -> Result<String, HashError> {
        let cost = self.cost;
        let plain = plain.to_owned();
        let digest = task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??;
        Ok(digest)
    }

    /// Spend the same bcrypt work as [`verify`](Self::verify) when there is no
    /// stored digest to check, so a missing account costs as much as a wrong
    /// password.
    pub async fn verify_absent(&self, plain: &str) {
        let cost = self.cost;
        let plain = plain.to_owned();
        if let Err(err) = task::spawn_blocking(move || bcrypt::hash(plain, cost)).await {
            warn!("Password verification task failed: {err}");
        }
    }

    /// Check `plain` against a stored digest. Unparseable digests never match.
    pub async fn verify(&self, plain: &str, digest: &str) -> bool {
        let plain = plain.to_owned();
        let digest = digest.to_owned();
        match task::spawn_blocking(move || bcrypt::verify(plain, &digest)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(err)) => {
                warn!("Stored password digest is unusable: {err}");
                false
            }
            Err(err) => {
                warn!("Password verification task failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::with_cost(TEST_COST);
        let digest = hasher.hash("longpassword1").await.unwrap();

        assert!(digest.starts_with("$2"));
        assert!(hasher.verify("longpassword1", &digest).await);
        assert!(!hasher.verify("longpassword2", &digest).await);
    }

    #[tokio::test]
    async fn salts_differ_per_call() {
        let hasher = PasswordHasher::with_cost(TEST_COST);
        let first = hasher.hash("longpassword1").await.unwrap();
        let second = hasher.hash("longpassword1").await.unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("longpassword1", &second).await);
    }

    #[tokio::test]
    async fn garbage_digest_never_matches() {
        let hasher = PasswordHasher::with_cost(TEST_COST);
        assert!(!hasher.verify("longpassword1", "not-a-bcrypt-digest").await);
        assert!(!hasher.verify("", "").await);
    }

    #[tokio::test]
    async fn absent_digest_costs_a_full_hash() {
        let hasher = PasswordHasher::with_cost(10);
        let digest = hasher.hash("longpassword1").await.unwrap();

        let started = std::time::Instant::now();
        assert!(!hasher.verify("wrongpassword", &digest).await);
        let verify = started.elapsed();

        let started = std::time::Instant::now();
        hasher.verify_absent("wrongpassword").await;
        let absent = started.elapsed();

        assert!(absent * 4 >= verify, "absent {absent:?} vs verify {verify:?}");
    }

    #[test]
    fn default_uses_bcrypt_default_cost() {
        assert_eq!(PasswordHasher::default().cost, bcrypt::DEFAULT_COST);
    }
}
