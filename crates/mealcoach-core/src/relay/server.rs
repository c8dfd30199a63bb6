//! Axum router and shared state.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::config::RelayConfig;
use super::handler;
use super::upstream::UpstreamClient;

/// Conversations are small; this bound only guards against abuse.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Axum application state. Everything is read-only per request — there is no
/// shared mutable state between concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: Arc<RelayConfig>) -> Self {
        let upstream = Arc::new(UpstreamClient::new(reqwest::Client::new(), &config));
        Self { config, upstream }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(handler::handle_chat).fallback(handler::method_not_allowed),
        )
        .route("/healthz", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}
