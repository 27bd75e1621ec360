//! Signed identity assertions.
//!
//! Tokens are compact JWTs signed with HS256 under the configured secret. The
//! algorithm is pinned for both signing and verification, so a token whose
//! header names anything else (including `none`) is rejected outright. Nothing
//! is persisted: any correctly signed, unexpired token is honored.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const TOKEN_TTL_HOURS: i64 = 24;
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject email.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Internal failure classes. Callers at the HTTP edge collapse every
/// verification failure into the same "invalid token" response.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing key is not configured")]
    MissingKey,
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unexpected signing algorithm")]
    InvalidAlgorithm,
    #[error("token expired")]
    Expired,
    #[error("failed to encode token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Token issuer and verifier bound to a single symmetric secret.
pub struct TokenKeys {
    keys: Option<Keys>,
    ttl: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("configured", &self.is_configured())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    /// Build from the configured secret. An absent or empty secret produces
    /// keys that refuse to issue and reject every token.
    #[must_use]
    pub fn new(secret: Option<&SecretString>) -> Self {
        let keys = secret
            .map(|secret| secret.expose_secret())
            .filter(|secret| !secret.is_empty())
            .map(|secret| Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });

        Self {
            keys,
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    /// Issue a token for `email`, valid for 24 hours from now.
    ///
    /// # Errors
    /// Returns [`TokenError::MissingKey`] when no secret is configured, or an
    /// encoding error from the signer.
    pub fn issue(&self, email: &str) -> Result<String, TokenError> {
        self.issue_at(email, Utc::now())
    }

    fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingKey)?;
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &keys.encoding)
            .map_err(TokenError::Encode)
    }

    /// Verify structure, algorithm, signature, issue time and expiry, in that order.
    ///
    /// # Errors
    /// Returns the specific [`TokenError`] describing why the token was refused.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let keys = self.keys.as_ref().ok_or(TokenError::MissingKey)?;

        // Expiry is checked below against `now` with no leeway.
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &keys.decoding, &validation)
            .map_err(classify)?
            .claims;

        if claims.iat > now.timestamp() {
            return Err(TokenError::Malformed);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::InvalidAlgorithm
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(Some(&SecretString::from(secret.to_string())))
    }

    #[test]
    fn issue_then_verify_recovers_subject() {
        let keys = keys("test-secret");
        let before = Utc::now().timestamp();
        let token = keys.issue("a@x.com").unwrap();
        let claims = keys.verify(&token).unwrap();
        let after = Utc::now().timestamp();

        assert_eq!(claims.sub, "a@x.com");
        assert!(claims.iat >= before && claims.iat <= after);
        assert!(claims.iat <= after && after < claims.exp);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn rejects_token_signed_with_another_key() {
        let token = keys("old-secret").issue("a@x.com").unwrap();

        assert!(matches!(
            keys("new-secret").verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let keys = keys("test-secret");
        let issued = Utc::now() - Duration::hours(TOKEN_TTL_HOURS + 1);
        let token = keys.issue_at("a@x.com", issued).unwrap();

        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let keys = keys("test-secret");
        let issued = Utc::now();
        let token = keys.issue_at("a@x.com", issued).unwrap();
        let expiry = issued + Duration::hours(TOKEN_TTL_HOURS);

        assert!(keys.verify_at(&token, expiry - Duration::seconds(1)).is_ok());
        assert!(matches!(
            keys.verify_at(&token, expiry),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn rejects_token_issued_in_the_future() {
        let keys = keys("test-secret");
        let now = Utc::now();
        let token = keys.issue_at("a@x.com", now + Duration::minutes(5)).unwrap();

        assert!(matches!(
            keys.verify_at(&token, now),
            Err(TokenError::Malformed)
        ));
        assert!(keys
            .verify_at(&token, now + Duration::minutes(5))
            .is_ok());
    }

    #[test]
    fn rejects_other_algorithms_with_same_secret() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "a@x.com".to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            keys("test-secret").verify(&token),
            Err(TokenError::InvalidAlgorithm)
        ));
    }

    #[test]
    fn rejects_unsigned_token() {
        // {"alg":"none","typ":"JWT"}.{"sub":"a@x.com"}.
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOiJhQHguY29tIn0.";
        assert!(keys("test-secret").verify(token).is_err());
    }

    #[test]
    fn rejects_malformed_structure() {
        let keys = keys("test-secret");
        assert!(matches!(keys.verify("not-a-token"), Err(TokenError::Malformed)));
        assert!(keys.verify("a.b.c").is_err());
        assert!(keys.verify("").is_err());
    }

    #[test]
    fn missing_secret_fails_closed() {
        let unset = TokenKeys::new(None);
        let empty = TokenKeys::new(Some(&SecretString::from(String::new())));

        assert!(!unset.is_configured());
        assert!(!empty.is_configured());
        assert!(matches!(unset.issue("a@x.com"), Err(TokenError::MissingKey)));
        assert!(matches!(empty.issue("a@x.com"), Err(TokenError::MissingKey)));

        let token = keys("test-secret").issue("a@x.com").unwrap();
        assert!(matches!(unset.verify(&token), Err(TokenError::MissingKey)));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let rendered = format!("{:?}", keys("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("configured: true"));
    }
}
