//! Client for the rendering backend.
//!
//! The backend works on server-side scratch files, so the video pipeline is a
//! fixed sequence of argument-light calls:
//!
//! ```text
//! /text-to-speech/ ──▶ /background-video/ ──▶ /create-video/ ──▶ [/generate-subtitles/ ──▶ /add-hard-subtitles/]
//! ```
//!
//! Calls run one after another even where they are independent. The first
//! failure aborts the sequence. `/clean-up/` deletes the scratch files and is
//! exposed separately so the caller can issue it whatever the outcome.
//!
//! `text` goes both in the query string, where the backend's handlers read
//! it, and as a JSON body.

use crate::clients::upload::PdfUpload;
use crate::clients::{http_client, truncate_body};
use crate::config::ClientConfig;
use crate::error::ShortsError;
use crate::progress::{emit, ProgressCallback, RemoteCall};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

pub const EXTRACT_TEXT: &str = "/extract-text/";
pub const GENERATE_SCRIPT: &str = "/generate-script/";
pub const TEXT_TO_SPEECH: &str = "/text-to-speech/";
pub const BACKGROUND_VIDEO: &str = "/background-video/";
pub const CREATE_VIDEO: &str = "/create-video/";
pub const GENERATE_SUBTITLES: &str = "/generate-subtitles/";
pub const ADD_HARD_SUBTITLES: &str = "/add-hard-subtitles/";
pub const CLEAN_UP: &str = "/clean-up/";
pub const CREATE_CHECKOUT_SESSION: &str = "/create-checkout-session";

/// Options for [`BackendClient::generate_video`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoOptions {
    /// Background-footage query. `None` lets the backend pick its default.
    pub theme: Option<String>,
    /// Transcribe and burn in subtitles after compositing.
    pub subtitles: bool,
}

/// A hosted-checkout session created by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
}

#[derive(Deserialize)]
struct ExtractTextResponse {
    text: String,
}

#[derive(Deserialize)]
struct GenerateScriptResponse {
    script: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    progress: Option<ProgressCallback>,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ShortsError> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            progress: config.progress_callback.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    // ── Text and script ──────────────────────────────────────────────────

    /// Upload a PDF and get its plain text back.
    pub async fn extract_text(&self, upload: &PdfUpload) -> Result<String, ShortsError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str("application/pdf")
            .map_err(|e| ShortsError::Internal(format!("multipart: {e}")))?;
        let form = Form::new().part("file", part);

        let request = self.client.post(self.url(EXTRACT_TEXT)).multipart(form);
        let body: ExtractTextResponse = self
            .call_json(RemoteCall::ExtractText, EXTRACT_TEXT, request)
            .await?;
        info!(
            "Extracted {} chars from {}",
            body.text.len(),
            upload.file_name
        );
        Ok(body.text)
    }

    /// Ask the backend to write the script with its own provider credentials.
    pub async fn generate_script(&self, text: &str) -> Result<String, ShortsError> {
        let request = self
            .client
            .post(self.url(GENERATE_SCRIPT))
            .query(&[("text", text)])
            .json(&json!({ "text": text }));
        let body: GenerateScriptResponse = self
            .call_json(RemoteCall::GenerateScript, GENERATE_SCRIPT, request)
            .await?;
        Ok(body.script)
    }

    // ── Video pipeline ───────────────────────────────────────────────────

    /// Narrate `script` over themed footage, optionally with subtitles.
    pub async fn generate_video(
        &self,
        script: &str,
        options: &VideoOptions,
    ) -> Result<(), ShortsError> {
        debug!(
            "Video pipeline: {} chars, theme {:?}, subtitles {}",
            script.len(),
            options.theme,
            options.subtitles
        );

        let speech = self
            .client
            .post(self.url(TEXT_TO_SPEECH))
            .query(&[("text", script)])
            .json(&json!({ "text": script }));
        self.call(RemoteCall::TextToSpeech, TEXT_TO_SPEECH, speech)
            .await?;

        let mut footage = self.client.get(self.url(BACKGROUND_VIDEO));
        if let Some(theme) = options.theme.as_deref() {
            footage = footage.query(&[("query", theme)]);
        }
        self.call(RemoteCall::BackgroundVideo, BACKGROUND_VIDEO, footage)
            .await?;

        let compose = self.client.post(self.url(CREATE_VIDEO));
        self.call(RemoteCall::CreateVideo, CREATE_VIDEO, compose)
            .await?;

        if options.subtitles {
            let transcribe = self.client.post(self.url(GENERATE_SUBTITLES));
            self.call(RemoteCall::GenerateSubtitles, GENERATE_SUBTITLES, transcribe)
                .await?;

            let burn = self.client.post(self.url(ADD_HARD_SUBTITLES));
            self.call(RemoteCall::AddHardSubtitles, ADD_HARD_SUBTITLES, burn)
                .await?;
        }

        info!("Video pipeline finished");
        Ok(())
    }

    /// Delete the backend's scratch files.
    ///
    /// Emits no progress events: the outcome is only logged.
    pub async fn cleanup(&self) -> Result<(), ShortsError> {
        let request = self.client.post(self.url(CLEAN_UP));
        self.send_inner(CLEAN_UP, request).await.map(|_| ())
    }

    // ── Billing ──────────────────────────────────────────────────────────

    /// Open a subscription checkout for `price_id`.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
    ) -> Result<CheckoutSession, ShortsError> {
        let request = self
            .client
            .post(self.url(CREATE_CHECKOUT_SESSION))
            .json(&json!({ "priceId": price_id }));
        self.call_json(
            RemoteCall::CreateCheckoutSession,
            CREATE_CHECKOUT_SESSION,
            request,
        )
        .await
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    async fn call(
        &self,
        call: RemoteCall,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<(), ShortsError> {
        self.exchange(call, endpoint, request, |_| Ok(())).await
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        call: RemoteCall,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ShortsError> {
        self.exchange(call, endpoint, request, |body| {
            serde_json::from_str(body).map_err(|e| ShortsError::Backend {
                endpoint,
                status: None,
                reason: format!("unexpected response body: {e}"),
            })
        })
        .await
    }

    /// Send one request, decode its 2xx body, and report the outcome.
    async fn exchange<T>(
        &self,
        call: RemoteCall,
        endpoint: &'static str,
        request: RequestBuilder,
        decode: impl FnOnce(&str) -> Result<T, ShortsError>,
    ) -> Result<T, ShortsError> {
        emit(&self.progress, |cb| cb.on_call_start(call));
        let result = match self.send_inner(endpoint, request).await {
            Ok(body) => decode(&body),
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => emit(&self.progress, |cb| cb.on_call_complete(call)),
            Err(e) => {
                warn!("{}", e);
                emit(&self.progress, |cb| cb.on_call_error(call, &e.to_string()));
            }
        }
        result
    }

    async fn send_inner(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<String, ShortsError> {
        debug!("→ {}", endpoint);
        let response = request.send().await.map_err(|e| ShortsError::Backend {
            endpoint,
            status: None,
            reason: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ShortsError::Backend {
            endpoint,
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(ShortsError::Backend {
                endpoint,
                status: Some(status.as_u16()),
                reason: error_detail(status.as_u16(), &body),
            });
        }
        Ok(body)
    }
}

/// Prefer the backend's `detail` message over the raw body.
fn error_detail(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| match b.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
    match detail {
        Some(d) => format!("HTTP {status}: {d}"),
        None if body.trim().is_empty() => format!("HTTP {status}"),
        None => format!("HTTP {status}: {}", truncate_body(body)),
    }
}
