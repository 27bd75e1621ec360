//! `/health`: database-aware status with build details.

use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::{short_commit, store::DynStore, GIT_COMMIT_HASH};

const HEALTH_DB_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database connection is healthy", body = Health),
        (status = 503, description = "Database connection is unhealthy", body = Health)
    ),
    tag = "health",
)]
/// Report service status. `OPTIONS` returns the same status and headers with
/// an empty body.
pub async fn health(method: Method, Extension(store): Extension<DynStore>) -> impl IntoResponse {
    let db_healthy = probe_database(&store).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if db_healthy { "ok" } else { "error" }.to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let headers = format!(
        "{}:{}:{}",
        health.name,
        health.version,
        short_commit(&health.commit)
    )
    .parse::<HeaderValue>()
    .map(|x_app| {
        let mut headers = HeaderMap::new();
        headers.insert("X-App", x_app);
        headers
    })
    .unwrap_or_else(|err| {
        debug!("Failed to parse X-App header: {}", err);
        HeaderMap::new()
    });

    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, body)
}

async fn probe_database(store: &DynStore) -> bool {
    match timeout(Duration::from_secs(HEALTH_DB_TIMEOUT_SECONDS), store.ping()).await {
        Ok(Ok(())) => {
            debug!("Database connection is healthy");
            true
        }
        Ok(Err(err)) => {
            error!("Failed to ping database: {}", err);
            false
        }
        Err(_) => {
            warn!("Database health check timed out");
            false
        }
    }
}
