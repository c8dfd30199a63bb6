//! # Mealcoach Core
//!
//! Relay pipeline for the mealcoach chat service.
//!
//! ```text
//! mealcoach-core/src/relay/
//! ├── request.rs   # Inbound body parsing and shape validation
//! ├── compose.rs   # System-prompt injection + generation parameter merge
//! ├── upstream.rs  # Provider dispatch with one-shot model fallback
//! ├── stream.rs    # SSE byte passthrough
//! ├── error.rs     # Client-facing error normalization
//! ├── handler.rs   # The chat handler tying the pipeline together
//! ├── server.rs    # Axum router + shared state
//! └── config.rs    # One config struct replacing the old handler variants
//! ```

pub mod relay;
