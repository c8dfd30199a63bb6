//! Relay configuration.
//!
//! The deployed service used to exist as a pile of near-duplicate handlers
//! (streaming vs. buffered, with/without fallback, with/without the family
//! secret, different token budgets). Every axis of variation is a field here
//! instead; the handler itself has exactly one code path.
//!
//! Credentials are injected through this struct rather than read from the
//! process environment inside the pipeline, so tests can run against a fake
//! provider with fake keys.

/// Default provider endpoint (OpenAI chat completions).
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Header carrying the optional shared secret.
pub const SECRET_HEADER: &str = "x-family-secret";

pub const DEFAULT_MODEL: &str = "gpt-5";
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Token budget when no tier keyword matches.
pub const BASE_MAX_TOKENS: u32 = 700;

/// Reply text used when the provider returns a completion without content.
pub const REPLY_FALLBACK: &str =
    "Sorry — I couldn't come up with a response. Please try again.";

/// The coach persona. Opaque to the pipeline; injected as the first message
/// of every outbound conversation.
pub const SYSTEM_PROMPT: &str = "You are a supportive, practical nutrition coach. \
Help the user plan meals that meet daily calorie and macro goals. Use common, \
affordable foods; provide swaps and grocery tips; ask brief clarifying questions \
only when truly necessary.";

/// One rung of the token-budget ladder: if any keyword appears in the
/// lowercased conversation text, the budget may rise to `max_tokens`.
///
/// NOTE: this is a keyword heuristic carried over from the original handlers.
/// It is English-only and prone to false positives; it widens budgets, it does
/// not guarantee them.
#[derive(Debug, Clone)]
pub struct TokenTier {
    pub keywords: Vec<String>,
    pub max_tokens: u32,
}

impl TokenTier {
    pub fn new(keywords: &[&str], max_tokens: u32) -> Self {
        Self { keywords: keywords.iter().map(|k| (*k).to_string()).collect(), max_tokens }
    }
}

/// Tiers in increasing order of scope. Escalation keeps the maximum matched
/// budget, so a message that mentions both a recipe and a weekly plan gets
/// the weekly budget.
pub fn default_token_tiers() -> Vec<TokenTier> {
    vec![
        TokenTier::new(&["recipe", "ingredients", "how do i make"], 1100),
        TokenTier::new(&["meal plan", "plan my meals", "dinner ideas"], 1500),
        TokenTier::new(&["week", "weekly", "7 day", "7-day"], 2200),
    ]
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay mode: stream the provider's SSE bytes through verbatim, or
    /// buffer the JSON reply and re-shape it. Chosen by deployment, never by
    /// request content.
    pub streaming: bool,
    /// Model used when the caller doesn't name one.
    pub default_model: String,
    /// Retried once when the requested model answers 401/403/404.
    /// `None` disables the fallback entirely.
    pub fallback_model: Option<String>,
    /// `None` disables the access gate.
    pub shared_secret: Option<String>,
    /// Provider API key. `None` is a server misconfiguration reported as 500
    /// before any upstream call.
    pub api_key: Option<String>,
    /// Provider chat-completions endpoint.
    pub upstream_url: String,
    /// Persona prepended to every conversation.
    pub system_prompt: String,
    /// Default sampling temperature; caller overrides outside [0, 1] fall
    /// back to this.
    pub temperature: f64,
    /// Token budget when no tier matches.
    pub base_max_tokens: u32,
    /// Budget escalation ladder, in increasing order of scope.
    pub token_tiers: Vec<TokenTier>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            default_model: DEFAULT_MODEL.to_string(),
            fallback_model: Some(DEFAULT_FALLBACK_MODEL.to_string()),
            shared_secret: None,
            api_key: None,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            base_max_tokens: BASE_MAX_TOKENS,
            token_tiers: default_token_tiers(),
        }
    }
}
