//! Progress-callback trait for creation-workflow events.
//!
//! Inject an [`Arc<dyn WorkflowProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to hear about
//! every remote call the workflow issues and every step it enters. The CLI
//! uses this to drive its spinner; tests use it to count calls.
//!
//! # Example
//!
//! ```rust
//! use pdf2short::{ClientConfig, RemoteCall, WorkflowProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CallCounter(AtomicUsize);
//!
//! impl WorkflowProgressCallback for CallCounter {
//!     fn on_call_start(&self, _call: RemoteCall) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(Arc::new(CallCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::workflow::Step;
use std::fmt;
use std::sync::Arc;

/// One remote call issued on behalf of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    ExtractText,
    GenerateScript,
    TextToSpeech,
    BackgroundVideo,
    CreateVideo,
    GenerateSubtitles,
    AddHardSubtitles,
    CreateCheckoutSession,
}

impl RemoteCall {
    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            RemoteCall::ExtractText => "extracting text",
            RemoteCall::GenerateScript => "writing script",
            RemoteCall::TextToSpeech => "synthesising speech",
            RemoteCall::BackgroundVideo => "fetching background footage",
            RemoteCall::CreateVideo => "compositing video",
            RemoteCall::GenerateSubtitles => "transcribing subtitles",
            RemoteCall::AddHardSubtitles => "burning in subtitles",
            RemoteCall::CreateCheckoutSession => "opening checkout",
        }
    }
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Called by the workflow and the clients as remote calls progress.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait WorkflowProgressCallback: Send + Sync {
    /// Called just before a request is sent.
    fn on_call_start(&self, call: RemoteCall) {
        let _ = call;
    }

    /// Called when a request succeeded.
    fn on_call_complete(&self, call: RemoteCall) {
        let _ = call;
    }

    /// Called when a request failed.
    ///
    /// # Arguments
    /// * `error`: human-readable error description
    fn on_call_error(&self, call: RemoteCall, error: &str) {
        let _ = (call, error);
    }

    /// Called after the workflow moved to a new step.
    fn on_step_changed(&self, step: Step) {
        let _ = step;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl WorkflowProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn WorkflowProgressCallback>;

/// Forward to an optional callback.
pub(crate) fn emit(cb: &Option<ProgressCallback>, f: impl FnOnce(&dyn WorkflowProgressCallback)) {
    if let Some(cb) = cb {
        f(cb.as_ref());
    }
}
