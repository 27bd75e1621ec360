use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use super::Credentials;
use crate::{
    api::error::{ApiError, ErrorBody},
    auth::{PasswordHasher, TokenError, TokenKeys},
    store::DynStore,
};

// Unknown email and wrong password must be indistinguishable to the caller.
const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(ToSchema, Serialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Bearer token valid for 24 hours", body = TokenResponse),
        (status = 400, description = "Malformed email, password or body", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 500, description = "Signing key unconfigured or token generation failed", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(store): Extension<DynStore>,
    Extension(hasher): Extension<PasswordHasher>,
    Extension(tokens): Extension<Arc<TokenKeys>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(credentials) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    credentials.validate()?;

    let Some(user) = store.find_user_by_email(&credentials.email).await? else {
        hasher.verify_absent(&credentials.password).await;
        debug!("Login for unknown email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    };

    if !hasher.verify(&credentials.password, &user.password_hash).await {
        debug!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    let token = tokens.issue(&user.email).map_err(|err| {
        match err {
            TokenError::MissingKey => error!("Cannot issue token: signing key is not configured"),
            other => error!("Error generating token: {other}"),
        }
        ApiError::Internal
    })?;

    info!(user_id = user.id, "User logged in");

    Ok(Json(TokenResponse { token }))
}
