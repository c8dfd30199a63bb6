//! Prompt composition and generation-parameter resolution.
//!
//! Builds the outbound conversation (`[persona, ...caller turns]`) and merges
//! caller tuning overrides with configured defaults. The merge is forgiving:
//! an override outside its valid range resolves exactly as if it were absent.

use super::config::RelayConfig;
use super::request::{ChatMessage, ChatRequest, Role};

/// Fully resolved parameters for one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPlan {
    pub model: String,
    /// Persona first, then the caller's turns in original order.
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

/// Resolves a validated request against the configuration.
pub fn build_plan(config: &RelayConfig, request: &ChatRequest) -> CompletionPlan {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage {
        role: Role::System,
        content: config.system_prompt.clone(),
    });
    messages.extend(request.messages.iter().cloned());

    CompletionPlan {
        model: request
            .model
            .clone()
            .unwrap_or_else(|| config.default_model.clone()),
        temperature: request
            .tuning
            .temperature
            .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
            .unwrap_or(config.temperature),
        max_tokens: resolve_token_budget(config, &request.messages),
        top_p: request
            .tuning
            .top_p
            .filter(|p| p.is_finite() && *p > 0.0 && *p <= 1.0),
        frequency_penalty: request.tuning.frequency_penalty.filter(|v| v.is_finite()),
        presence_penalty: request.tuning.presence_penalty.filter(|v| v.is_finite()),
        messages,
    }
}

/// Walks the tier ladder over the lowercased conversation text and keeps the
/// largest matched budget. Tiers are ordered by increasing scope, so a broad
/// trigger ("weekly") can never lose to a narrow one ("recipe").
fn resolve_token_budget(config: &RelayConfig, messages: &[ChatMessage]) -> u32 {
    let haystack = messages
        .iter()
        .map(|m| m.content.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");

    let mut budget = config.base_max_tokens;
    for tier in &config.token_tiers {
        if tier.keywords.iter().any(|k| haystack.contains(k.as_str())) {
            budget = budget.max(tier.max_tokens);
        }
    }
    budget
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::request::TuningOverrides;

    fn user_turn(content: &str) -> ChatMessage {
        ChatMessage { role: Role::User, content: content.to_string() }
    }

    fn request_with(content: &str, tuning: TuningOverrides) -> ChatRequest {
        ChatRequest { messages: vec![user_turn(content)], model: None, tuning }
    }

    #[test]
    fn persona_is_always_first() {
        let config = RelayConfig::default();
        let req = ChatRequest {
            messages: vec![
                ChatMessage { role: Role::System, content: "caller persona".to_string() },
                user_turn("hello"),
            ],
            model: None,
            tuning: TuningOverrides::default(),
        };

        let plan = build_plan(&config, &req);

        assert_eq!(plan.messages[0].role, Role::System);
        assert_eq!(plan.messages[0].content, config.system_prompt);
        // The caller's system turn is not deduplicated, just displaced to slot 1.
        assert_eq!(plan.messages[1].content, "caller persona");
        assert_eq!(plan.messages.len(), 3);
    }

    #[test]
    fn caller_model_wins_over_default() {
        let config = RelayConfig::default();
        let req = ChatRequest {
            messages: vec![],
            model: Some("gpt-5-mini".to_string()),
            tuning: TuningOverrides::default(),
        };
        assert_eq!(build_plan(&config, &req).model, "gpt-5-mini");
    }

    #[test]
    fn out_of_range_temperature_resolves_like_absent() {
        let config = RelayConfig::default();
        let with_bad = build_plan(
            &config,
            &request_with("hi", TuningOverrides { temperature: Some(1.5), ..Default::default() }),
        );
        let with_none = build_plan(&config, &request_with("hi", TuningOverrides::default()));
        assert_eq!(with_bad, with_none);
        assert_eq!(with_bad.temperature, config.temperature);
    }

    #[test]
    fn in_range_temperature_is_kept() {
        let config = RelayConfig::default();
        let plan = build_plan(
            &config,
            &request_with("hi", TuningOverrides { temperature: Some(0.2), ..Default::default() }),
        );
        assert_eq!(plan.temperature, 0.2);
    }

    #[test]
    fn top_p_of_zero_is_rejected() {
        let config = RelayConfig::default();
        let plan = build_plan(
            &config,
            &request_with("hi", TuningOverrides { top_p: Some(0.0), ..Default::default() }),
        );
        assert!(plan.top_p.is_none());
    }

    #[test]
    fn nan_overrides_fall_back_to_defaults() {
        let config = RelayConfig::default();
        let tuning = TuningOverrides {
            temperature: Some(f64::NAN),
            top_p: Some(f64::NAN),
            frequency_penalty: Some(f64::NAN),
            presence_penalty: Some(f64::NAN),
        };
        let plan = build_plan(&config, &request_with("hi", tuning));
        assert_eq!(plan.temperature, config.temperature);
        assert!(plan.top_p.is_none());
        assert!(plan.frequency_penalty.is_none());
        assert!(plan.presence_penalty.is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let config = RelayConfig::default();
        let req = request_with(
            "plan my meals for the week",
            TuningOverrides { temperature: Some(0.4), ..Default::default() },
        );
        assert_eq!(build_plan(&config, &req), build_plan(&config, &req));
    }

    #[test]
    fn base_budget_without_keywords() {
        let config = RelayConfig::default();
        let plan = build_plan(&config, &request_with("hello there", TuningOverrides::default()));
        assert_eq!(plan.max_tokens, config.base_max_tokens);
    }

    #[test]
    fn recipe_keyword_raises_budget() {
        let config = RelayConfig::default();
        let plan = build_plan(
            &config,
            &request_with("Got a good lentil soup recipe?", TuningOverrides::default()),
        );
        assert_eq!(plan.max_tokens, 1100);
    }

    #[test]
    fn broad_tier_beats_narrow_tier() {
        let config = RelayConfig::default();
        let plan = build_plan(
            &config,
            &request_with("A recipe for every day of the week, please", TuningOverrides::default()),
        );
        assert_eq!(plan.max_tokens, 2200);
    }

    #[test]
    fn keyword_match_spans_all_turns() {
        let config = RelayConfig::default();
        let req = ChatRequest {
            messages: vec![user_turn("What should I eat?"), user_turn("Make it a WEEKLY plan")],
            model: None,
            tuning: TuningOverrides::default(),
        };
        assert_eq!(build_plan(&config, &req).max_tokens, 2200);
    }
}
