//! Upstream dispatch with one-shot model fallback.
//!
//! Issues the provider call and classifies the outcome. When the requested
//! model answers 401/403/404 and a fallback model is configured, exactly one
//! retry is made against the fallback; the retry's failure (not the original)
//! is what the client sees. Network-level errors never propagate as panics —
//! they become a failure with a synthetic 502 status.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::compose::CompletionPlan;
use super::config::RelayConfig;
use super::error::RelayError;
use super::request::ChatMessage;

/// Statuses that mean "this model, not this request, is the problem" and are
/// worth one retry on the fallback model.
fn is_fallback_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 404)
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
}

impl UpstreamClient {
    /// Accepts a pre-built `reqwest::Client` so the (potentially blocking)
    /// TLS setup happens once at startup, not per request.
    pub fn new(http: reqwest::Client, config: &RelayConfig) -> Self {
        Self { http, endpoint: config.upstream_url.clone() }
    }

    /// One provider call for `model`; transport errors are returned, status
    /// classification is the caller's job.
    async fn send(
        &self,
        plan: &CompletionPlan,
        model: &str,
        stream: bool,
        api_key: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let body = CompletionBody {
            model,
            messages: &plan.messages,
            stream,
            temperature: plan.temperature,
            max_tokens: plan.max_tokens,
            top_p: plan.top_p,
            frequency_penalty: plan.frequency_penalty,
            presence_penalty: plan.presence_penalty,
        };
        self.http.post(&self.endpoint).bearer_auth(api_key).json(&body).send().await
    }

    /// Dispatches the plan, applying the fallback policy at most once.
    ///
    /// Returns the raw successful response (streamed or buffered reading is
    /// the relay's concern) or the normalized failure.
    pub async fn dispatch(
        &self,
        plan: &CompletionPlan,
        stream: bool,
        api_key: &str,
        fallback_model: Option<&str>,
    ) -> Result<reqwest::Response, RelayError> {
        debug!(model = %plan.model, stream, "dispatching upstream request");

        let response = match self.send(plan, &plan.model, stream, api_key).await {
            Ok(response) => response,
            Err(err) => {
                warn!("upstream transport error: {err}");
                return Err(RelayError::Upstream { status: 502, detail: err.to_string() });
            },
        };

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();

        // Fallback is pointless when it would re-issue the same model.
        let fallback = fallback_model.filter(|fb| *fb != plan.model);

        let (Some(fallback), true) = (fallback, is_fallback_status(status)) else {
            let detail = provider_message(response).await;
            return Err(RelayError::Upstream { status, detail });
        };

        let original_detail = provider_message(response).await;
        warn!(
            model = %plan.model,
            fallback,
            status,
            "model unavailable ({original_detail}), retrying once on fallback"
        );

        match self.send(plan, fallback, stream, api_key).await {
            Ok(retry) if retry.status().is_success() => Ok(retry),
            Ok(retry) => {
                let status = retry.status().as_u16();
                let detail = provider_message(retry).await;
                Err(RelayError::Upstream { status, detail })
            },
            Err(err) => {
                warn!("fallback transport error: {err}");
                Err(RelayError::Upstream { status: 502, detail: err.to_string() })
            },
        }
    }
}

/// Reads the failure body once and extracts a provider message.
///
/// The provider's error format varies by status: structured
/// `{"error":{"message":...}}` documents for API-level failures, plain text
/// from intermediaries. Both are handled; the body is never read twice.
async fn provider_message(response: reqwest::Response) -> String {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_else(|_| format!("HTTP {status}"));
    extract_provider_detail(&text)
}

fn extract_provider_detail(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_structured_provider_message() {
        let raw = r#"{"error":{"message":"model `gpt-5` does not exist","type":"invalid_request_error"}}"#;
        assert_eq!(extract_provider_detail(raw), "model `gpt-5` does not exist");
    }

    #[test]
    fn structured_body_without_message_is_kept_compact() {
        let raw = r#"{"error":{"code":503}}"#;
        assert_eq!(extract_provider_detail(raw), r#"{"error":{"code":503}}"#);
    }

    #[test]
    fn plain_text_body_passes_through() {
        assert_eq!(extract_provider_detail("upstream connect error"), "upstream connect error");
    }

    #[test]
    fn json_scalar_body_is_not_mistaken_for_structured() {
        assert_eq!(extract_provider_detail(r#""overloaded""#), r#""overloaded""#);
    }

    #[test]
    fn fallback_statuses() {
        assert!(is_fallback_status(401));
        assert!(is_fallback_status(403));
        assert!(is_fallback_status(404));
        assert!(!is_fallback_status(429));
        assert!(!is_fallback_status(500));
    }
}
