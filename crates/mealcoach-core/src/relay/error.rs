//! Client-facing error normalization.
//!
//! Everything the pipeline can fail with collapses into one enum, and every
//! variant renders as a stable JSON shape. Upstream failures are always
//! surfaced as an outer 502 — the provider's status travels only inside the
//! payload, so clients never have to distinguish "our 401" from "their 401".
//!
//! Raw provider bodies are logged server-side; the client payload carries the
//! extracted provider message plus a short human-readable hint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid JSON body.")]
    InvalidBody,

    #[error("`messages` must be an array of chat turns.")]
    BadMessages,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Server is missing its API credentials.")]
    MissingApiKey,

    /// Any non-success provider outcome, after the fallback attempt (if
    /// eligible) has been exhausted. Transport failures use a synthetic 502.
    #[error("upstream failure (HTTP {status}): {detail}")]
    Upstream { status: u16, detail: String },
}

/// Hint text keyed on the provider's status, not ours.
pub fn upstream_hint(status: u16) -> &'static str {
    match status {
        401 | 403 => "The server's provider credentials were rejected.",
        404 => "The requested model is not available.",
        _ => "The meal coach service had trouble reaching its provider.",
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::InvalidBody | RelayError::BadMessages => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            RelayError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            RelayError::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Server is missing its API credentials." })),
            )
                .into_response(),
            RelayError::Upstream { status, detail } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": upstream_hint(status),
                    "status": status,
                    "detail": detail,
                })),
            )
                .into_response(),
        }
    }
}
