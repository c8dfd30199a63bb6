//! Mealcoach Server - Headless Daemon
//!
//! A pure Rust HTTP server that relays family chat conversations to the
//! completion provider on /api/chat, injecting the coach persona and
//! normalizing provider failures.
//!
//! Configuration is environment-sourced only (no CLI flags, no files):
//! - OPENAI_API_KEY            provider key (required for requests to succeed)
//! - FAMILY_SECRET             optional shared secret; unset disables the gate
//! - MEALCOACH_PORT            listen port (default 8090)
//! - MEALCOACH_STREAMING       relay mode, true/false (default true)
//! - MEALCOACH_MODEL           default model
//! - MEALCOACH_FALLBACK_MODEL  fallback model; empty disables fallback
//! - MEALCOACH_UPSTREAM_URL    provider endpoint override

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mealcoach_core::relay::{build_router, AppState, RelayConfig};

const DEFAULT_PORT: u16 = 8090;

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(raw) = env_string(name) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(anyhow::anyhow!(
            "invalid boolean value for {name}: {raw:?} (expected true/false)"
        )),
    }
}

fn resolve_upstream_url(default: &str) -> String {
    match env_string("MEALCOACH_UPSTREAM_URL") {
        Some(raw) => {
            let candidate = raw.trim_end_matches('/').to_string();
            if url::Url::parse(&candidate).is_err() {
                warn!("MEALCOACH_UPSTREAM_URL is not a valid URL, using default");
                return default.to_string();
            }
            info!("Using custom upstream URL");
            candidate
        },
        None => default.to_string(),
    }
}

fn config_from_env() -> Result<RelayConfig> {
    let mut config = RelayConfig::default();

    config.api_key = env_string("OPENAI_API_KEY");
    config.shared_secret = env_string("FAMILY_SECRET");
    config.upstream_url = resolve_upstream_url(&config.upstream_url);

    if let Some(streaming) = env_bool("MEALCOACH_STREAMING")? {
        config.streaming = streaming;
    }
    if let Some(model) = env_string("MEALCOACH_MODEL") {
        config.default_model = model;
    }
    // Set to an empty string to disable fallback entirely.
    if let Ok(raw) = std::env::var("MEALCOACH_FALLBACK_MODEL") {
        let trimmed = raw.trim();
        config.fallback_model =
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("MEALCOACH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let config = config_from_env()?;

    if config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; chat requests will fail with 500 until it is");
    }
    if config.shared_secret.is_none() {
        info!("FAMILY_SECRET not set; access gate disabled");
    }
    info!(
        streaming = config.streaming,
        model = %config.default_model,
        fallback = config.fallback_model.as_deref().unwrap_or("<none>"),
        "Mealcoach server starting on port {port}"
    );

    let state = AppState::new(Arc::new(config));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{addr}");
    info!("Chat endpoint at http://localhost:{port}/api/chat");

    axum::serve(listener, app).await?;

    Ok(())
}
