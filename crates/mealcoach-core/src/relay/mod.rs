//! Relay module - chat request relay service
//!
//! One configurable pipeline: validate the inbound conversation, gate on the
//! optional shared secret, prepend the coach persona, dispatch to the
//! completion provider (with a single model fallback on access errors), and
//! relay the result back as an SSE stream or a normalized JSON envelope.

pub mod compose;
pub mod config;
pub mod error;
pub mod handler;
pub mod request;
pub mod server;
pub mod stream;
pub mod upstream;

pub use config::{RelayConfig, TokenTier};
pub use error::RelayError;
pub use request::{ChatMessage, ChatRequest, Role};
pub use server::{build_router, AppState};
pub use upstream::UpstreamClient;
