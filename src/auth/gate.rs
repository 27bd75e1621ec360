//! Bearer gate for protected routes.
//!
//! [`require_bearer`] runs before any `/user/*` handler. It reads the
//! `Authorization` header, verifies the token and stores the resulting
//! [`Identity`] in the request extensions. Handlers take `Identity` as an
//! extractor instead of reading untyped request state.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use std::sync::Arc;
use tracing::{debug, error};

use super::token::{TokenError, TokenKeys};
use crate::api::error::ApiError;

pub const BEARER_PREFIX: &str = "Bearer ";

const MISSING_TOKEN: &str = "missing token";
const INVALID_FORMAT: &str = "invalid token format";
const INVALID_TOKEN: &str = "invalid token";

/// Verified caller identity for the lifetime of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub issued_at: i64,
}

/// Resolve the `Authorization` header into an identity.
///
/// # Errors
/// Returns `401` for a missing header, a non-bearer scheme, or any token the
/// verifier refuses. Verification failures share one response body.
pub fn authenticate(headers: &HeaderMap, keys: &TokenKeys) -> Result<Identity, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::Unauthorized(MISSING_TOKEN))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(ApiError::Unauthorized(INVALID_FORMAT))?;

    match keys.verify(token) {
        Ok(claims) => Ok(Identity {
            email: claims.sub,
            issued_at: claims.iat,
        }),
        Err(TokenError::MissingKey) => {
            error!("Rejecting bearer token: signing key is not configured");
            Err(ApiError::Unauthorized(INVALID_TOKEN))
        }
        Err(err) => {
            debug!("Rejecting bearer token: {err}");
            Err(ApiError::Unauthorized(INVALID_TOKEN))
        }
    }
}

/// Middleware guarding every protected route.
///
/// # Errors
/// Short-circuits with `401` before the handler runs when authentication fails.
pub async fn require_bearer(
    Extension(keys): Extension<Arc<TokenKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(request.headers(), &keys)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(ApiError::Unauthorized(MISSING_TOKEN))
    }
}
