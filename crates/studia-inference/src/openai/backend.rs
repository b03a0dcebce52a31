//! OpenAI-compatible generation backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use studia_core::defaults::{GEN_MODEL, GEN_TEMPERATURE, GEN_TIMEOUT_SECS, OPENAI_URL};
use studia_core::{Error, GenerationBackend, Result};

use super::error::{to_studia_error, OpenAIErrorCode};
use super::types::*;

/// Configuration for the OpenAI-compatible backend.
///
/// # Environment Variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | API endpoint |
/// | `OPENAI_API_KEY` | unset | Bearer token (optional for local endpoints) |
/// | `OPENAI_GEN_MODEL` | `gpt-4o-mini` | Generation model |
/// | `OPENAI_TIMEOUT` | `120` | Request timeout in seconds |
/// | `OPENAI_TEMPERATURE` | `0.4` | Sampling temperature |
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for generation.
    pub gen_model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask for `response_format: json_object`. Some local servers reject it.
    pub json_mode: bool,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_URL.to_string(),
            api_key: None,
            gen_model: GEN_MODEL.to_string(),
            timeout_seconds: GEN_TIMEOUT_SECS,
            temperature: GEN_TEMPERATURE,
            json_mode: true,
        }
    }
}

impl OpenAIConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gen_model: std::env::var("OPENAI_GEN_MODEL").unwrap_or(defaults.gen_model),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            temperature: std::env::var("OPENAI_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.temperature),
            json_mode: defaults.json_mode,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gen_model = model.into();
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// OpenAI-compatible generation backend.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new OpenAI backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.gen_model,
            timeout_secs = config.timeout_seconds,
            "Initializing OpenAI backend"
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAIConfig::default())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }

    async fn error_from_response(&self, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let (message, error_type, code) = match serde_json::from_str::<OpenAIErrorResponse>(&body) {
            Ok(parsed) => {
                let code = parsed.error.code_str();
                let message = if parsed.error.message.is_empty() {
                    status.to_string()
                } else {
                    parsed.error.message
                };
                (message, parsed.error.error_type.unwrap_or_default(), code)
            }
            Err(_) if body.trim().is_empty() => (status.to_string(), String::new(), None),
            Err(_) => (body.trim().to_string(), String::new(), None),
        };

        let code = OpenAIErrorCode::from_response(status.as_u16(), &error_type, code.as_deref());
        warn!(
            status = status.as_u16(),
            error_code = ?code,
            retryable = code.is_retryable(),
            "Generation request rejected: {}",
            message
        );
        to_studia_error(code, &format!("OpenAI returned {}: {}", status, message))
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        debug!(
            model = %self.config.gen_model,
            prompt_len = prompt.len(),
            "Generating"
        );

        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages,
            temperature: Some(self.config.temperature),
            response_format: self.config.json_mode.then(ResponseFormat::json_object),
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Failed to read response: {}", e)))?;
        let result: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or(Error::EmptyResponse)?;

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(Error::SafetyBlocked(refusal));
        }
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(Error::SafetyBlocked(
                "Response withheld by content filter".to_string(),
            ));
        }

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(Error::EmptyResponse);
        }

        if let Some(usage) = result.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generation complete"
            );
        }
        debug!(response_len = content.len(), "Generation complete");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}
