//! API handlers and shared request validation.

pub mod files;
pub mod health;
pub mod me;
pub mod user_login;
pub mod user_register;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::error::ApiError;
use crate::auth::password::MAX_PASSWORD_BYTES;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Request body for register and login.
#[derive(ToSchema, Deserialize)]
pub struct Credentials {
    #[schema(example = "a@x.com")]
    pub email: String,
    #[schema(example = "longpassword1", min_length = 8)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Lightweight email sanity check used before touching the store.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// At least eight characters and no more than bcrypt will actually read.
pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN && password.len() <= MAX_PASSWORD_BYTES
}

impl Credentials {
    /// # Errors
    /// Returns `400` naming the first field that fails validation.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !valid_email(&self.email) {
            return Err(ApiError::BadRequest("invalid email".to_string()));
        }
        if !valid_password(&self.password) {
            return Err(ApiError::BadRequest(format!(
                "password must be between {MIN_PASSWORD_LEN} characters and {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@x.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("a b@x.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn valid_password_enforces_bounds() {
        assert!(valid_password("longpassword1"));
        assert!(valid_password("12345678"));
        assert!(!valid_password("1234567"));
        assert!(!valid_password(&"x".repeat(MAX_PASSWORD_BYTES + 1)));
        assert!(valid_password(&"x".repeat(MAX_PASSWORD_BYTES)));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials {
            email: "a@x.com".to_string(),
            password: "longpassword1".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("longpassword1"));
    }

    #[test]
    fn validate_reports_first_failing_field() {
        let bad_email = Credentials {
            email: "nope".to_string(),
            password: "short".to_string(),
        };
        assert!(
            matches!(bad_email.validate(), Err(ApiError::BadRequest(msg)) if msg == "invalid email")
        );

        let bad_password = Credentials {
            email: "a@x.com".to_string(),
            password: "short".to_string(),
        };
        assert!(matches!(
            bad_password.validate(),
            Err(ApiError::BadRequest(_))
        ));
    }
}
