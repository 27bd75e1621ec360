//! HTTP surface.
//!
//! Public routes: `POST /auth/register`, `POST /auth/login`, `GET|OPTIONS
//! /health` and the API docs. Everything under `/user` runs behind the bearer
//! gate. Shared components reach handlers through `Extension` layers.

use crate::{
    auth::{gate::require_bearer, PasswordHasher, TokenKeys},
    blobs::BlobStore,
    cli::globals::GlobalArgs,
    store::{DynStore, PgStore},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use handlers::{files, health, me, user_login, user_register};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, warn, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
mod openapi;

pub use openapi::ApiDoc;

const REQUEST_ID: &str = "x-request-id";

/// Components shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub tokens: Arc<TokenKeys>,
    pub hasher: PasswordHasher,
    pub blobs: BlobStore,
    pub max_upload_size: usize,
}

/// Build the full application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let user = Router::new()
        .route("/me", get(me::me))
        .route(
            "/upload",
            post(files::upload).layer(DefaultBodyLimit::max(state.max_upload_size)),
        )
        .route("/download", get(files::list))
        .route("/download/:fileID", get(files::download))
        .route_layer(middleware::from_fn(require_bearer));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/auth/register", post(user_register::register))
        .route("/auth/login", post(user_login::login))
        .route("/health", get(health::health).options(health::health))
        .nest("/user", user)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(state.store))
                .layer(Extension(state.tokens))
                .layer(Extension(state.hasher))
                .layer(Extension(state.blobs)),
        )
}

/// Connect to the database, prepare storage and serve until interrupted.
///
/// # Errors
/// Returns an error if the database, migrations, uploads directory or listener fail.
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let blobs = BlobStore::open(&globals.uploads_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create uploads directory {}",
                globals.uploads_dir.display()
            )
        })?;

    let tokens = TokenKeys::new(globals.jwt_secret.as_ref());
    if !tokens.is_configured() {
        warn!("Token signing key is not configured");
    }

    let app = router(AppState {
        store: Arc::new(PgStore::new(pool)),
        tokens: Arc::new(tokens),
        hasher: PasswordHasher::default(),
        blobs,
        max_upload_size: globals.max_upload_size,
    });

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method = %request.method(), path, request_id)
}
