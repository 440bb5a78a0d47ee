//! LLM backends
//!
//! Two wire protocols cover the supported providers:
//! - OpenAI-compatible chat completions (OpenAI, OpenRouter) via `async-openai`
//! - Anthropic messages API via `reqwest`

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Judgments are short JSON objects
const DEFAULT_MAX_TOKENS: u32 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Empty response")]
    EmptyResponse,
}

/// Text-in, text-out completion
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Recorded as `model_id` on every judgment
    fn model_name(&self) -> &str;
}

pub type SharedBackend = Arc<dyn LlmBackend>;

/// Which hosted API to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    OpenAi,
    OpenRouter,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-20250514",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::OpenRouter => "anthropic/claude-sonnet-4",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn key_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
            Provider::OpenRouter => "OpenRouter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAIBackendConfig {
    pub api_key: String,
    /// Alternative API base (OpenRouter, local servers)
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl OpenAIBackendConfig {
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: None,
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn openrouter(api_key: &str, model: &str) -> Self {
        Self {
            base_url: Some(OPENROUTER_API_BASE.to_string()),
            ..Self::openai(api_key, model)
        }
    }
}

pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
    config: OpenAIBackendConfig,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIBackendConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("missing API key".to_string()));
        }
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| LlmError::Api(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| LlmError::Api(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl AnthropicConfig {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("missing API key".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "messages": [
                {"role": "user", "content": user}
            ]
        });

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("Anthropic API error {}: {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        json["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find_map(|b| b["text"].as_str()))
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Build the backend for `provider`; `model` falls back to the provider default
pub fn create_backend(
    provider: Provider,
    api_key: &str,
    model: Option<&str>,
) -> Result<SharedBackend, LlmError> {
    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(provider.default_model());
    let backend: SharedBackend = match provider {
        Provider::Anthropic => Arc::new(AnthropicBackend::new(AnthropicConfig::new(api_key, model))?),
        Provider::OpenAi => Arc::new(OpenAIBackend::new(OpenAIBackendConfig::openai(api_key, model))?),
        Provider::OpenRouter => {
            Arc::new(OpenAIBackend::new(OpenAIBackendConfig::openrouter(api_key, model))?)
        }
    };
    Ok(backend)
}
