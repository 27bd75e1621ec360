use secrecy::SecretString;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 32 * 1024 * 1024;

/// Process-wide settings handed to the HTTP layer.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub uploads_dir: PathBuf,
    /// Token signing secret; `None` leaves issuance and verification disabled.
    pub jwt_secret: Option<SecretString>,
    pub max_upload_size: usize,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            jwt_secret: None,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }

    pub fn set_jwt_secret(&mut self, secret: SecretString) {
        self.jwt_secret = Some(secret);
    }
}
