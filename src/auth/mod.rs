//! Credential hashing, bearer tokens, the request gate and file ownership.
//!
//! Flow Overview:
//! 1) Register hashes the password with [`PasswordHasher`].
//! 2) Login verifies the digest and issues a token with [`TokenKeys`].
//! 3) Protected routes pass through [`gate::require_bearer`], which turns a
//!    valid token into an [`Identity`].
//! 4) File routes resolve the record and check it against that identity in
//!    [`ownership`].

pub mod gate;
pub mod ownership;
pub mod password;
pub mod token;

pub use gate::Identity;
pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenKeys};
