//! Remote collaborators of the creation workflow.
//!
//! ```text
//! upload ──▶ backend::extract_text ──▶ llm::ScriptGenerator ──▶ backend::generate_video
//! (path/URL)   (/extract-text/)          (chat completions)       (tts → footage → compose → subs)
//! ```
//!
//! 1. [`upload`]: canonicalise the user-supplied path or URL to PDF bytes
//! 2. [`backend`]: extraction, the video pipeline, cleanup and checkout
//!    sessions on the rendering backend
//! 3. [`llm`]: one chat-completion adapter per provider behind the
//!    [`llm::CompletionProvider`] capability trait
//!
//! Nothing here retries. Each call either succeeds or hands its error back.

pub mod backend;
pub mod llm;
pub mod upload;

use crate::config::ClientConfig;
use crate::error::ShortsError;
use std::time::Duration;

/// Build the shared HTTP client, applying the optional per-request timeout.
pub(crate) fn http_client(config: &ClientConfig) -> Result<reqwest::Client, ShortsError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("pdf2short/", env!("CARGO_PKG_VERSION")));
    if let Some(secs) = config.api_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| ShortsError::Internal(format!("Failed to create HTTP client: {e}")))
}

/// Keep error bodies short enough for a log line.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}\u{2026}", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
