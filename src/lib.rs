//! # Filekeep (Authentication & Per-User File Storage)
//!
//! `filekeep` registers users with an email and password, issues signed bearer
//! tokens on login and gates upload, listing and download of per-user files
//! behind those tokens.
//!
//! ## Authentication
//!
//! Passwords are stored as salted bcrypt digests. A successful login returns an
//! HS256 token carrying the subject email, issued-at and an expiry 24 hours
//! later. The signing secret comes from the process configuration; without it
//! token issuance fails closed.
//!
//! ## Authorization
//!
//! Every `/user/*` route runs behind the bearer gate, which verifies the token
//! and hands the handler a typed [`auth::Identity`]. File downloads are only
//! served to the file's owner: a missing record is `404`, a record owned by
//! someone else is `403`.
//!
//! ## Storage
//!
//! User and file records live behind the [`store::Store`] trait (Postgres in
//! production). Blobs are written under the uploads directory at an opaque,
//! server-generated path; the client's filename is kept only as metadata.

pub mod api;
pub mod auth;
pub mod blobs;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// First seven characters of a commit hash, or the trimmed hash if shorter.
#[must_use]
pub fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
