//! Configuration for the remote clients and the creation workflow.
//!
//! Every knob lives in [`ClientConfig`], built via [`ClientConfigBuilder`].
//! Defaults reproduce the product's fixed behaviour: backend on
//! `localhost:5050`, temperature 0.4, 1500 output tokens, no request timeout.

use crate::error::ShortsError;
use crate::model::{AiModel, Plan};
use crate::progress::ProgressCallback;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5050";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Configuration shared by [`crate::clients`] and [`crate::workflow`].
///
/// # Example
/// ```rust
/// use pdf2short::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .backend_url("http://render.internal:5050")
///     .api_timeout_secs(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 1500);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Base origin of the rendering backend. Default: `http://localhost:5050`.
    pub backend_url: String,

    /// Chat-completions base URL for Groq.
    pub groq_base_url: String,

    /// Chat-completions base URL for OpenAI.
    pub openai_base_url: String,

    /// Chat-completions base URL for Gemini's OpenAI-compatible surface.
    pub gemini_base_url: String,

    /// Sampling temperature for script generation. Default: 0.4.
    pub temperature: f32,

    /// Output-token cap for script generation. Default: 1500.
    pub max_tokens: u32,

    /// Custom system prompt. If None, uses [`crate::prompts::SCRIPT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Where scripts come from. Default: [`ScriptSource::Provider`].
    pub script_source: ScriptSource,

    /// Per-request timeout in seconds for backend and provider calls.
    ///
    /// `None` (the default) waits indefinitely; a hung call then leaves the
    /// workflow busy until the caller drops it.
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL uploads in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Payment-processor price ids for the paid plans.
    pub price_ids: PriceIds,

    /// Receives remote-call and step events from the workflow.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            groq_base_url: GROQ_BASE_URL.to_string(),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            temperature: 0.4,
            max_tokens: 1500,
            system_prompt: None,
            script_source: ScriptSource::default(),
            api_timeout_secs: None,
            download_timeout_secs: 120,
            price_ids: PriceIds::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("backend_url", &self.backend_url)
            .field("groq_base_url", &self.groq_base_url)
            .field("openai_base_url", &self.openai_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("script_source", &self.script_source)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("price_ids", &self.price_ids)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn WorkflowProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Chat-completions base URL for `model`.
    pub fn provider_base_url(&self, model: AiModel) -> &str {
        match model {
            AiModel::Groq => &self.groq_base_url,
            AiModel::OpenAi => &self.openai_base_url,
            AiModel::Gemini => &self.gemini_base_url,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend_url = url.into();
        self
    }

    pub fn provider_base_url(mut self, model: AiModel, url: impl Into<String>) -> Self {
        let url = url.into();
        match model {
            AiModel::Groq => self.config.groq_base_url = url,
            AiModel::OpenAi => self.config.openai_base_url = url,
            AiModel::Gemini => self.config.gemini_base_url = url,
        }
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn script_source(mut self, source: ScriptSource) -> Self {
        self.config.script_source = source;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn price_ids(mut self, ids: PriceIds) -> Self {
        self.config.price_ids = ids;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ShortsError> {
        let c = &self.config;
        validate_http_url("backend_url", &c.backend_url)?;
        for model in AiModel::ALL {
            validate_http_url(model.as_str(), c.provider_base_url(model))?;
        }
        if c.max_tokens == 0 {
            return Err(ShortsError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(ShortsError::InvalidConfig(
                "api_timeout_secs must be ≥ 1 when set".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(ShortsError::InvalidConfig(
                "download_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ShortsError> {
    let url = Url::parse(value)
        .map_err(|e| ShortsError::InvalidConfig(format!("{field}: '{value}' is not a URL ({e})")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ShortsError::InvalidConfig(format!(
            "{field}: '{value}' must use http or https"
        )));
    }
    Ok(())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the creation workflow gets its script from.
///
/// `Provider` calls the selected LLM directly with the user's own key, which
/// means the key travels from this process. `Backend` posts the text to the
/// backend's `/generate-script/` route and keeps provider secrets server-side;
/// the selected model and the user's keys are then ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptSource {
    #[default]
    Provider,
    Backend,
}

/// Payment-processor price ids for the paid plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceIds {
    pub pro: String,
    pub enterprise: String,
}

impl Default for PriceIds {
    fn default() -> Self {
        Self {
            pro: "price_1OpLbxFxUPuGxxxxxxxxxxxxxx".to_string(),
            enterprise: "price_1OpLcaFxUPuGxxxxxxxxxxxxxx".to_string(),
        }
    }
}

impl PriceIds {
    /// The price id for a paid plan; `None` for [`Plan::Free`].
    pub fn for_plan(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Free => None,
            Plan::Pro => Some(&self.pro),
            Plan::Enterprise => Some(&self.enterprise),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_budget() {
        let c = ClientConfig::default();
        assert_eq!(c.temperature, 0.4);
        assert_eq!(c.max_tokens, 1500);
        assert_eq!(c.backend_url, "http://localhost:5050");
        assert!(c.api_timeout_secs.is_none());
        assert_eq!(c.script_source, ScriptSource::Provider);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ClientConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_non_http_backend() {
        let err = ClientConfig::builder()
            .backend_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ShortsError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_garbage_provider_url() {
        let err = ClientConfig::builder()
            .provider_base_url(AiModel::Gemini, "not a url")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("gemini"), "got: {err}");
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ClientConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(ClientConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn provider_override_is_routed_by_model() {
        let c = ClientConfig::builder()
            .provider_base_url(AiModel::OpenAi, "http://127.0.0.1:9999/v1")
            .build()
            .unwrap();
        assert_eq!(c.provider_base_url(AiModel::OpenAi), "http://127.0.0.1:9999/v1");
        assert_eq!(c.provider_base_url(AiModel::Groq), GROQ_BASE_URL);
    }

    #[test]
    fn free_plan_has_no_price() {
        let ids = PriceIds::default();
        assert!(ids.for_plan(Plan::Free).is_none());
        assert!(ids.for_plan(Plan::Pro).is_some());
    }
}
