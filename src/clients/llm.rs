//! Script generation through a user-selected LLM provider.
//!
//! Each provider is an adapter behind [`CompletionProvider`]; the
//! [`AiModel`] tag picks the adapter in [`provider_for`]. All three speak the
//! OpenAI chat-completions shape, so the adapters share one request path and
//! differ in base URL and model id.
//!
//! [`ScriptGenerator`] owns the error policy: a rejected key (401/403) becomes
//! [`ShortsError::InvalidApiKey`]; everything else, including an empty
//! completion, becomes [`ShortsError::ScriptGenerationFailed`]. No retry.

use crate::clients::{http_client, truncate_body};
use crate::config::ClientConfig;
use crate::error::{ProviderError, ShortsError};
use crate::model::AiModel;
use crate::prompts::{summary_request, SCRIPT_SYSTEM_PROMPT};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// System and user message for one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrompt {
    pub system: String,
    pub user: String,
}

/// Sampling budget for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The capability every provider adapter offers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Model identifier sent with each request.
    fn model_id(&self) -> &str;

    /// Run one completion and return the generated text.
    async fn complete(
        &self,
        prompt: &CompletionPrompt,
        params: &CompletionParams,
    ) -> Result<String, ProviderError>;
}

// ── OpenAI-compatible wire types ─────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Shared request path for the three adapters.
struct ChatCompletions {
    provider: &'static str,
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
}

impl ChatCompletions {
    async fn send(
        &self,
        prompt: &CompletionPrompt,
        params: &CompletionParams,
    ) -> Result<String, ProviderError> {
        let provider = self.provider;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: &self.model_id,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport { provider, source })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized {
                provider,
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::Transport { provider, source })?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider,
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider,
                detail: e.to_string(),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed {
                provider,
                detail: "no completion content in response".to_string(),
            })
    }
}

// ── Adapters ─────────────────────────────────────────────────────────────

macro_rules! chat_adapter {
    ($(#[$doc:meta])* $name:ident, $provider:literal, $model:literal) => {
        $(#[$doc])*
        pub struct $name(ChatCompletions);

        impl $name {
            pub const DEFAULT_MODEL: &'static str = $model;

            pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
                Self(ChatCompletions {
                    provider: $provider,
                    client,
                    base_url: base_url.into(),
                    api_key: api_key.into(),
                    model_id: $model.to_string(),
                })
            }
        }

        #[async_trait]
        impl CompletionProvider for $name {
            fn name(&self) -> &'static str {
                $provider
            }

            fn model_id(&self) -> &str {
                &self.0.model_id
            }

            async fn complete(
                &self,
                prompt: &CompletionPrompt,
                params: &CompletionParams,
            ) -> Result<String, ProviderError> {
                self.0.send(prompt, params).await
            }
        }
    };
}

chat_adapter!(
    /// Groq's OpenAI-compatible endpoint.
    Groq,
    "groq",
    "llama-3.1-8b-instant"
);
chat_adapter!(
    /// OpenAI chat completions.
    OpenAi,
    "openai",
    "gpt-3.5-turbo"
);
chat_adapter!(
    /// Gemini through Google's OpenAI-compatible surface.
    Gemini,
    "gemini",
    "gemini-2.0-flash"
);

/// Pick the adapter for `model`.
pub fn provider_for(
    model: AiModel,
    api_key: &str,
    client: &Client,
    config: &ClientConfig,
) -> Box<dyn CompletionProvider> {
    let base = config.provider_base_url(model);
    match model {
        AiModel::Groq => Box::new(Groq::new(client.clone(), base, api_key)),
        AiModel::OpenAi => Box::new(OpenAi::new(client.clone(), base, api_key)),
        AiModel::Gemini => Box::new(Gemini::new(client.clone(), base, api_key)),
    }
}

// ── Script generator ─────────────────────────────────────────────────────

/// Turns extracted PDF text into a narration script.
#[derive(Clone)]
pub struct ScriptGenerator {
    client: Client,
    config: ClientConfig,
}

impl ScriptGenerator {
    pub fn new(config: &ClientConfig) -> Result<Self, ShortsError> {
        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
        })
    }

    /// The fixed prompt for `text`, honouring a configured system prompt.
    pub fn prompt_for(&self, text: &str) -> CompletionPrompt {
        CompletionPrompt {
            system: self
                .config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SCRIPT_SYSTEM_PROMPT.to_string()),
            user: summary_request(text),
        }
    }

    pub fn params(&self) -> CompletionParams {
        CompletionParams {
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Generate a script with the provider selected by `model`.
    pub async fn generate(
        &self,
        text: &str,
        model: AiModel,
        api_key: &str,
    ) -> Result<String, ShortsError> {
        let provider = provider_for(model, api_key, &self.client, &self.config);
        self.generate_with(provider.as_ref(), text).await
    }

    /// Generate a script with an explicit provider.
    pub async fn generate_with(
        &self,
        provider: &dyn CompletionProvider,
        text: &str,
    ) -> Result<String, ShortsError> {
        let start = Instant::now();
        debug!(
            "Generating script with {} ({}) from {} chars",
            provider.name(),
            provider.model_id(),
            text.len()
        );

        let result = provider
            .complete(&self.prompt_for(text), &self.params())
            .await;
        match result {
            Ok(script) if !script.trim().is_empty() => {
                debug!(
                    "{}: {} chars of script in {:?}",
                    provider.name(),
                    script.len(),
                    start.elapsed()
                );
                Ok(script)
            }
            Ok(_) => {
                warn!("{}: empty completion", provider.name());
                Err(ShortsError::ScriptGenerationFailed)
            }
            Err(e) if e.is_auth() => {
                warn!("{}", e);
                Err(ShortsError::InvalidApiKey)
            }
            Err(e) => {
                warn!("Script generation failed: {}", e);
                Err(ShortsError::ScriptGenerationFailed)
            }
        }
    }
}
