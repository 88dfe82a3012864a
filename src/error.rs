//! Error types for the pdf2short library.
//!
//! Two error types reflect two layers:
//!
//! * [`ShortsError`]: what callers of the library see. Every workflow trigger,
//!   session command and client call returns it. Its `Display` text is what
//!   the CLI prints.
//!
//! * [`ProviderError`]: the raw outcome of one LLM chat-completion request.
//!   It never leaves [`crate::clients::llm`]; the script generator collapses
//!   it into [`ShortsError::InvalidApiKey`] or
//!   [`ShortsError::ScriptGenerationFailed`].

use crate::model::AiModel;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2short library.
#[derive(Debug, Error)]
pub enum ShortsError {
    // ── Precondition failures (no remote call attempted) ─────────────────
    /// The selected model has no API key on the user profile.
    #[error("Please add your {} API key in settings.", model.as_str().to_uppercase())]
    MissingApiKey { model: AiModel },

    /// The command needs a logged-in user.
    #[error("Not logged in.\nRun `pdf2short login` or `pdf2short register` first.")]
    NotAuthenticated,

    /// A workflow trigger was called from the wrong step.
    #[error("Cannot {action} while the workflow is at the {step} step")]
    InvalidStep { action: &'static str, step: &'static str },

    /// A workflow trigger was called while another call is outstanding.
    #[error("Another request is still in progress")]
    Busy,

    // ── Auth failures ─────────────────────────────────────────────────────
    /// Login credentials did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The LLM provider rejected the user's key (HTTP 401/403).
    #[error("Invalid API key. Please check your API key and try again.")]
    InvalidApiKey,

    // ── Remote call failures ──────────────────────────────────────────────
    /// The backend could not extract text from the uploaded PDF.
    #[error("Failed to extract text from PDF. Please try again.")]
    ExtractionFailed,

    /// Script generation failed for any reason other than a rejected key.
    #[error("Failed to generate script. Please try again later.")]
    ScriptGenerationFailed,

    /// The video pipeline failed at some step.
    #[error("Failed to generate video. Please try again.")]
    VideoGenerationFailed,

    /// A backend endpoint returned an error or could not be reached.
    #[error("Backend call {endpoint} failed: {reason}")]
    Backend {
        endpoint: &'static str,
        status: Option<u16>,
        reason: String,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not usable (empty, unknown plan name, …).
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── Persisted state errors ────────────────────────────────────────────
    /// The stored session blob could not be parsed.
    #[error("Stored session at '{location}' is corrupt: {detail}\nDelete it to start a fresh session.")]
    CorruptState { location: String, detail: String },

    /// The stored session was written by a newer release.
    #[error(
        "Stored session at '{location}' uses schema version {found}; this build understands up to {supported}.\n\
Upgrade pdf2short or delete the file."
    )]
    UnsupportedSchemaVersion {
        location: String,
        found: u32,
        supported: u32,
    },

    /// Reading the session blob failed for a reason other than absence.
    #[error("Failed to read session state from '{location}': {source}")]
    StateReadFailed {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the session blob failed.
    #[error("Failed to write session state to '{location}': {source}")]
    StateWriteFailed {
        location: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShortsError {
    /// `true` for errors detected locally before any remote call.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ShortsError::MissingApiKey { .. }
                | ShortsError::NotAuthenticated
                | ShortsError::InvalidStep { .. }
                | ShortsError::Busy
        )
    }
}

/// Outcome of a failed chat-completion request, before normalisation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 401 or 403.
    #[error("provider '{provider}' rejected the API key (HTTP {status})")]
    Unauthorized { provider: &'static str, status: u16 },

    /// Any other non-success status.
    #[error("provider '{provider}' returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Connection, TLS or timeout failure.
    #[error("request to provider '{provider}' failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The body did not contain a usable completion.
    #[error("provider '{provider}' sent an unusable response: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
}

impl ProviderError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Unauthorized { .. })
    }
}
