//! # pdf2short
//!
//! Turn a PDF into a short narrated video.
//!
//! A rendering backend extracts the PDF's text, an LLM provider of the user's
//! choosing condenses it into a punchy script, and the backend then narrates
//! that script over themed stock footage, optionally burning in subtitles.
//! Finished videos are recorded in a locally persisted session together with
//! the user's profile, provider keys and subscription tier.
//!
//! ## Workflow Overview
//!
//! ```text
//! PDF (path or URL)
//!  │
//!  ├─ 1. Upload   resolve + validate, POST /extract-text/      → ScriptReview
//!  ├─ 2. Script   chat completion on groq / openai / gemini   → VideoReview
//!  ├─ 3. Video    tts → footage → compose → [subtitles]       → Closed
//!  └─ 4. Cleanup  POST /clean-up/, always, errors ignored
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2short::{resolve_upload, AiModel, ClientConfig, CreationWorkflow, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let mut session = SessionStore::open_file("auth-storage.json")?;
//!     session.login("user@example.com", "pass")?;
//!     session.set_api_key(AiModel::Groq, Some("gsk_...".into()));
//!
//!     let pdf = resolve_upload("report.pdf", config.download_timeout_secs).await?;
//!     let mut workflow = CreationWorkflow::open(&config, &session)?;
//!     workflow.set_subtitles(true);
//!     workflow.upload(&pdf).await?;
//!     workflow.generate_script(&session).await?;
//!     let video = workflow.generate_video(&mut session).await?;
//!     println!("{} ({})", video.title, video.url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2short` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2short = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod billing;
pub mod clients;
pub mod config;
pub mod draft;
pub mod error;
pub mod model;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod storage;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use billing::{plan_info, plans, upgrade, PlanInfo};
pub use clients::backend::{BackendClient, CheckoutSession, VideoOptions};
pub use clients::llm::{CompletionParams, CompletionPrompt, CompletionProvider, ScriptGenerator};
pub use clients::upload::{resolve_upload, PdfUpload};
pub use config::{ClientConfig, ClientConfigBuilder, PriceIds, ScriptSource};
pub use draft::VideoDraft;
pub use error::{ProviderError, ShortsError};
pub use model::{
    AiModel, ApiKeys, Plan, Settings, Subscription, SubscriptionStatus, Theme, User, UserPatch,
    Video,
};
pub use progress::{NoopProgressCallback, ProgressCallback, RemoteCall, WorkflowProgressCallback};
pub use session::{SessionObserver, SessionStore, SubscriptionId};
pub use storage::{FileStorage, MemoryStorage, SessionState, StateStorage};
pub use workflow::{CreationWorkflow, Step};
