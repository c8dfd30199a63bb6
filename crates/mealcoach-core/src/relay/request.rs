//! Inbound request parsing and shape validation.
//!
//! The body is read exactly once (it cannot be re-read), parsed as JSON, and
//! checked against the one hard shape constraint: `messages` must be an array
//! of chat turns. Tuning fields are extracted leniently — a wrongly typed
//! `temperature` is treated as absent, never rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn. Order matters; caller-supplied system turns are
/// passed through as-is (the composer injects its own regardless).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Caller-supplied sampling overrides, captured raw. Range checks happen in
/// the composer so that out-of-range values merge to defaults instead of
/// failing the request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TuningOverrides {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

/// A validated inbound chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Present only if the caller sent a non-empty string after trimming.
    pub model: Option<String>,
    pub tuning: TuningOverrides,
}

/// Parses and validates the raw request body.
///
/// Failure modes map to the two fixed 400 messages; nothing here panics on
/// arbitrary input.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, RelayError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RelayError::InvalidBody)?;

    let messages = match value.get("messages") {
        Some(Value::Array(turns)) => turns
            .iter()
            .map(|turn| serde_json::from_value::<ChatMessage>(turn.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RelayError::BadMessages)?,
        _ => return Err(RelayError::BadMessages),
    };

    let model = value
        .get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    let tuning = TuningOverrides {
        temperature: number_field(&value, "temperature"),
        top_p: number_field(&value, "top_p"),
        frequency_penalty: number_field(&value, "frequency_penalty"),
        presence_penalty: number_field(&value, "presence_penalty"),
    };

    Ok(ChatRequest { messages, model, tuning })
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}
