//! The creation workflow: a three-step wizard from PDF to finished video.
//!
//! ```text
//! Upload ──upload()──▶ ScriptReview ──generate_script()──▶ VideoReview ──generate_video()──▶ Closed
//! ```
//!
//! Steps only move forward, and only after the remote call behind them
//! succeeds. A failed trigger leaves the step where it was, sets the error
//! banner and keeps everything gathered so far, so the same trigger can be
//! retried. [`CreationWorkflow::close`] drops all draft state at any point.
//!
//! The [`SessionStore`] stays with the caller. Script generation borrows it
//! to read the user's API key; the terminal step borrows it mutably to record
//! the new video.

use crate::clients::backend::{BackendClient, VideoOptions};
use crate::clients::llm::ScriptGenerator;
use crate::clients::upload::PdfUpload;
use crate::config::{ClientConfig, ScriptSource};
use crate::draft::VideoDraft;
use crate::error::ShortsError;
use crate::model::{AiModel, Video};
use crate::progress::{emit, ProgressCallback, RemoteCall};
use crate::session::SessionStore;
use chrono::Utc;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Title given to every video the workflow records.
pub const NEW_VIDEO_TITLE: &str = "New Video";

/// File the backend leaves behind after the last pipeline call.
pub const OUTPUT_FILE: &str = "output_with_subtitles.mp4";

/// Where the wizard currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Upload,
    ScriptReview,
    VideoReview,
    Closed,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::ScriptReview => "script review",
            Step::VideoReview => "video review",
            Step::Closed => "closed",
        }
    }

    /// 1-based position shown to users; `None` once closed.
    pub fn number(self) -> Option<u8> {
        match self {
            Step::Upload => Some(1),
            Step::ScriptReview => Some(2),
            Step::VideoReview => Some(3),
            Step::Closed => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct CreationWorkflow {
    backend: BackendClient,
    scripts: ScriptGenerator,
    script_source: ScriptSource,
    progress: Option<ProgressCallback>,
    step: Step,
    draft: VideoDraft,
    error: Option<String>,
    extracted_text: Option<String>,
    script: Option<String>,
}

impl fmt::Debug for CreationWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreationWorkflow")
            .field("backend", &self.backend.base_url())
            .field("script_source", &self.script_source)
            .field("step", &self.step)
            .field("draft", &self.draft)
            .field("error", &self.error)
            .field("extracted_text", &self.extracted_text.as_ref().map(String::len))
            .field("script", &self.script.as_ref().map(String::len))
            .finish()
    }
}

impl CreationWorkflow {
    /// Open a fresh workflow at the upload step.
    ///
    /// The draft model follows the logged-in user's default model.
    pub fn open(config: &ClientConfig, session: &SessionStore) -> Result<Self, ShortsError> {
        Ok(Self::with_clients(
            BackendClient::new(config)?,
            ScriptGenerator::new(config)?,
            config,
            session,
        ))
    }

    /// Open a workflow around existing clients.
    pub fn with_clients(
        backend: BackendClient,
        scripts: ScriptGenerator,
        config: &ClientConfig,
        session: &SessionStore,
    ) -> Self {
        let draft = VideoDraft::for_user(session.user());
        debug!("Opening creation workflow with model {}", draft.model);
        Self {
            backend,
            scripts,
            script_source: config.script_source,
            progress: config.progress_callback.clone(),
            step: Step::Upload,
            draft,
            error: None,
            extracted_text: None,
            script: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &VideoDraft {
        &self.draft
    }

    /// The banner from the last failed trigger, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.extracted_text.as_deref()
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.draft.busy
    }

    // ── Draft setters ────────────────────────────────────────────────────

    pub fn select_model(&mut self, model: AiModel) {
        self.draft.model = model;
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.draft.theme = theme.into();
    }

    pub fn set_subtitles(&mut self, subtitles: bool) {
        self.draft.subtitles = subtitles;
    }

    // ── Triggers ─────────────────────────────────────────────────────────

    /// Step 1 → 2: extract the text of `upload` through the backend.
    pub async fn upload(&mut self, upload: &PdfUpload) -> Result<(), ShortsError> {
        self.begin("upload a PDF", Step::Upload)?;
        info!("Uploading {} ({} bytes)", upload.file_name, upload.bytes.len());

        self.draft.busy = true;
        let result = self.backend.extract_text(upload).await;
        self.draft.busy = false;

        match result {
            Ok(text) => {
                self.extracted_text = Some(text);
                self.advance(Step::ScriptReview);
                Ok(())
            }
            Err(e) => {
                warn!("Text extraction failed: {}", e);
                Err(self.fail(ShortsError::ExtractionFailed))
            }
        }
    }

    /// Step 2 → 3: write the narration script for the extracted text.
    ///
    /// With [`ScriptSource::Provider`] the selected model needs an API key on
    /// the user's profile. A missing key fails before any request is sent.
    pub async fn generate_script(&mut self, session: &SessionStore) -> Result<(), ShortsError> {
        self.begin("generate a script", Step::ScriptReview)?;
        let text = self.extracted_text.clone().unwrap_or_default();
        let model = self.draft.model;

        let result = match self.script_source {
            ScriptSource::Provider => {
                let Some(api_key) = session.api_key_for(model) else {
                    return Err(self.fail(ShortsError::MissingApiKey { model }));
                };
                self.draft.busy = true;
                emit(&self.progress, |cb| cb.on_call_start(RemoteCall::GenerateScript));
                let result = self.scripts.generate(&text, model, api_key).await;
                match &result {
                    Ok(_) => emit(&self.progress, |cb| {
                        cb.on_call_complete(RemoteCall::GenerateScript)
                    }),
                    Err(e) => emit(&self.progress, |cb| {
                        cb.on_call_error(RemoteCall::GenerateScript, &e.to_string())
                    }),
                }
                result
            }
            ScriptSource::Backend => {
                self.draft.busy = true;
                match self.backend.generate_script(&text).await {
                    Ok(script) if !script.trim().is_empty() => Ok(script),
                    Ok(_) => {
                        warn!("Backend returned an empty script");
                        Err(ShortsError::ScriptGenerationFailed)
                    }
                    Err(_) => Err(ShortsError::ScriptGenerationFailed),
                }
            }
        };
        self.draft.busy = false;

        match result {
            Ok(script) => {
                info!("Script ready: {} chars", script.len());
                self.script = Some(script);
                self.advance(Step::VideoReview);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Step 3 → closed: render the video and record it in `session`.
    ///
    /// `/clean-up/` runs afterwards whatever the outcome; its failure is
    /// logged and does not change the result.
    pub async fn generate_video(&mut self, session: &mut SessionStore) -> Result<Video, ShortsError> {
        self.begin("generate the video", Step::VideoReview)?;
        let script = self.script.clone().unwrap_or_default();
        let options = VideoOptions {
            theme: self.draft.theme_query().map(str::to_string),
            subtitles: self.draft.subtitles,
        };

        self.draft.busy = true;
        let result = self.backend.generate_video(&script, &options).await;

        let recorded = match result {
            Ok(()) => {
                let video = Video {
                    id: Uuid::new_v4().to_string(),
                    title: NEW_VIDEO_TITLE.to_string(),
                    url: OUTPUT_FILE.to_string(),
                    created_at: Utc::now(),
                    duration: 0,
                    thumbnail: None,
                };
                session.add_video(video.clone());
                Ok(video)
            }
            Err(e) => {
                warn!("Video generation failed: {}", e);
                Err(ShortsError::VideoGenerationFailed)
            }
        };

        if let Err(e) = self.backend.cleanup().await {
            warn!("Cleanup failed (ignored): {}", e);
        }
        self.draft.busy = false;

        match recorded {
            Ok(video) => {
                self.close();
                Ok(video)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Discard all draft state and close the wizard.
    pub fn close(&mut self) {
        self.draft = VideoDraft::default();
        self.error = None;
        self.extracted_text = None;
        self.script = None;
        self.advance(Step::Closed);
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// Gate a trigger on the busy flag and the expected step, then clear the
    /// banner.
    fn begin(&mut self, action: &'static str, expected: Step) -> Result<(), ShortsError> {
        if self.draft.busy {
            return Err(ShortsError::Busy);
        }
        if self.step != expected {
            return Err(ShortsError::InvalidStep {
                action,
                step: self.step.label(),
            });
        }
        self.error = None;
        Ok(())
    }

    fn fail(&mut self, err: ShortsError) -> ShortsError {
        self.error = Some(err.to_string());
        err
    }

    fn advance(&mut self, step: Step) {
        if self.step == step {
            return;
        }
        debug!("Workflow: {} -> {}", self.step, step);
        self.step = step;
        emit(&self.progress, |cb| cb.on_step_changed(step));
    }
}
