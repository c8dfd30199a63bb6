//! The chat handler.
//!
//! One code path: parse → gate → compose → dispatch → relay. Every failure
//! is caught here and rendered through `RelayError`; nothing reaches axum as
//! a panic or an unhandled error.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use super::compose::build_plan;
use super::config::{RelayConfig, REPLY_FALLBACK, SECRET_HEADER};
use super::error::RelayError;
use super::request::parse_chat_request;
use super::server::AppState;
use super::stream::relay_sse;

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match relay_chat(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// MethodRouter fallback for the chat route: anything but POST.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        "Method Not Allowed",
    )
        .into_response()
}

async fn relay_chat(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, RelayError> {
    let config = &state.config;

    // Body first: a malformed request reports 400 even when the gate would
    // also have rejected it.
    let request = parse_chat_request(body)?;
    check_shared_secret(config, headers)?;

    let api_key = config.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;

    let plan = build_plan(config, &request);
    debug!(
        model = %plan.model,
        max_tokens = plan.max_tokens,
        turns = plan.messages.len(),
        "relaying conversation"
    );

    let response = state
        .upstream
        .dispatch(&plan, config.streaming, api_key, config.fallback_model.as_deref())
        .await?;

    if config.streaming {
        Ok(relay_sse(response))
    } else {
        buffered_reply(&plan.model, response).await
    }
}

/// The access gate: a no-op unless a secret is configured.
fn check_shared_secret(config: &RelayConfig, headers: &HeaderMap) -> Result<(), RelayError> {
    let Some(secret) = config.shared_secret.as_deref() else {
        return Ok(());
    };

    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if presented.is_some_and(|p| constant_time_compare(p, secret)) {
        Ok(())
    } else {
        Err(RelayError::Unauthorized)
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Buffered mode: reads the provider's JSON document, extracts the first
/// completion's text, and re-emits the normalized envelope.
async fn buffered_reply(
    requested_model: &str,
    response: reqwest::Response,
) -> Result<Response, RelayError> {
    let payload: Value = response.json().await.map_err(|err| RelayError::Upstream {
        status: 502,
        detail: format!("unreadable provider response: {err}"),
    })?;

    let reply = payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or(REPLY_FALLBACK);

    // Prefer the model the provider says it used over the one we asked for;
    // after a fallback retry the two differ.
    let model_used = payload.get("model").and_then(Value::as_str).unwrap_or(requested_model);

    info!(model_used, "relayed buffered reply");

    Ok((
        StatusCode::OK,
        Json(json!({ "model_used": model_used, "reply": reply })),
    )
        .into_response())
}
