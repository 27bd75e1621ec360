use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info, instrument};

use super::{Credentials, MessageResponse};
use crate::{
    api::error::{ApiError, ErrorBody},
    auth::PasswordHasher,
    store::{DynStore, StoreError},
};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Malformed email, password or body", body = ErrorBody),
        (status = 409, description = "Email already exists", body = ErrorBody),
        (status = 500, description = "Hashing or storage failure", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(store): Extension<DynStore>,
    Extension(hasher): Extension<PasswordHasher>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(credentials) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    credentials.validate()?;

    let digest = hasher.hash(&credentials.password).await.map_err(|err| {
        error!("Error hashing password: {err}");
        ApiError::Internal
    })?;

    match store.create_user(&credentials.email, &digest).await {
        Ok(user) => {
            info!(user_id = user.id, "User registered");
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    message: "user created".to_string(),
                }),
            ))
        }
        Err(StoreError::Conflict) => Err(ApiError::Conflict("email already exists")),
        Err(err) => Err(err.into()),
    }
}
