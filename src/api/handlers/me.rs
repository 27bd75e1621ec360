use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{api::error::ErrorBody, auth::Identity};

#[derive(ToSchema, Serialize, Debug)]
pub struct MeResponse {
    pub email: String,
}

#[utoipa::path(
    get,
    path = "/user/me",
    responses(
        (status = 200, description = "Email of the authenticated user", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn me(identity: Identity) -> Json<MeResponse> {
    Json(MeResponse {
        email: identity.email,
    })
}
