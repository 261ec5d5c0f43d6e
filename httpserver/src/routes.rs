//! HTTP route handlers served by the `serve` command.
//!
//! `/ready` reports 503 as soon as a shutdown was requested, so load
//! balancers stop routing new traffic while in-flight requests drain.

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router, response::IntoResponse};
use httpserver::CancellationToken;
use serde_json::json;
use tracing::instrument;

/// Creates the router with the built-in endpoints.
pub fn routes() -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/ready", get(get_ready))
}

/// `GET /` — simple greeting.
#[instrument(skip_all)]
async fn get_root() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!("Hello from ", env!("CARGO_PKG_NAME"), "!"),
    )
}

/// `GET /health` — lightweight liveness check.
#[instrument(skip_all)]
async fn get_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /ready` — readiness check that fails once shutdown begins.
#[instrument(skip_all)]
async fn get_ready(Extension(shutdown): Extension<CancellationToken>) -> impl IntoResponse {
    if shutdown.is_cancelled() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "shutting down" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    }
}
