//! HTTP gateway (axum).
//!
//! Routes:
//! - `GET /healthz`: liveness
//! - `GET /ready`: scratch space and cleanup worker status
//! - `POST /analyze`: multipart upload (`file` field) → JSON analysis

pub mod error;
pub mod handler;
pub mod state;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::analyze_handler;
pub use state::HandlerState;

/// Response header carrying a short status (`ok`, `ready`, a verdict, or `error`).
pub const LUCID_STATUS_HEADER: &str = "x-lucid-status";

pub fn create_router_with_state(state: HandlerState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/analyze", post(analyze_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub(crate) fn status_headers(status: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        LUCID_STATUS_HEADER,
        HeaderValue::from_str(status).unwrap_or(HeaderValue::from_static("error")),
    );
    headers
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub scratch: &'static str,
    pub cleanup: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    (
        StatusCode::OK,
        status_headers("ok"),
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let scratch_root = &state.pipeline.config().scratch_root;
    let scratch = match tokio::fs::create_dir_all(scratch_root).await {
        Ok(()) if scratch_root.is_dir() => "ready",
        _ => "error",
    };
    let cleanup = if state.pipeline.cleanup().is_shutdown_initiated() {
        "stopped"
    } else {
        "ready"
    };

    let components = ComponentStatus {
        http: "ready",
        scratch,
        cleanup,
    };
    let is_ready = components.scratch == "ready" && components.cleanup == "ready";

    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "pending")
    };

    (
        status_code,
        status_headers(status_msg),
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
