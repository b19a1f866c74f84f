//! Ollama chat API client
//!
//! Talks to a locally-hosted Ollama server over `/api/chat`.
//!
//! # Example
//!
//! ```ignore
//! use review_profiler::llm::{ChatRequest, LlmClient, LlmConfig, OllamaClient};
//!
//! let client = OllamaClient::from_config(&LlmConfig::with_model("llama3.2"));
//! let text = client.chat(&ChatRequest::new("You are terse.", "Hello")).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{ChatMessage, ChatRequest, LlmClient};
use super::config::LlmConfig;
use super::error::{LlmError, LlmResult};

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name to use
    model: String,
    /// Request timeout in seconds
    timeout_seconds: u64,
    /// Maximum context tokens
    max_context_tokens: usize,
    /// Temperature for sampling
    temperature: f32,
    /// HTTP client
    #[cfg(feature = "llm-online")]
    client: reqwest::Client,
}

/// Request body for the Ollama chat endpoint
#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct ChatOptions {
    temperature: f32,
    num_ctx: usize,
}

/// Response from the Ollama chat endpoint
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    total_duration: Option<u64>,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ResponseMessage {
    #[serde(default)]
    role: String,
    content: String,
}

/// Response from Ollama tags endpoint (list models)
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Ollama API (e.g., "http://localhost:11434")
    /// * `model` - Model name to use (e.g., "llama3.2")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout_seconds: 300,
            max_context_tokens: 8192,
            temperature: 0.1,
            #[cfg(feature = "llm-online")]
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from an [`LlmConfig`]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(&config.url, &config.model)
            .with_timeout(config.timeout_seconds)
            .with_max_context(config.max_context_tokens)
            .with_temperature(config.temperature)
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the maximum context tokens
    pub fn with_max_context(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    /// Set the temperature for sampling
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> ChatBody<'a> {
        ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            format: request.json_format.then_some("json"),
            options: ChatOptions {
                temperature: self.temperature,
                num_ctx: self.max_context_tokens,
            },
        }
    }

    /// List available models on the Ollama server
    #[cfg(feature = "llm-online")]
    pub async fn list_models(&self) -> LlmResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::ApiError {
                status: response.status().as_u16(),
                message: "failed to list models".to_string(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// List available models (stub for when feature is disabled)
    #[cfg(not(feature = "llm-online"))]
    pub async fn list_models(&self) -> LlmResult<Vec<String>> {
        Err(LlmError::FeatureNotAvailable(
            "Online LLM".to_string(),
            "llm-online".to_string(),
        ))
    }

    /// Check if the configured model is pulled on the server
    pub async fn model_available(&self) -> LlmResult<bool> {
        let models = self.list_models().await?;
        Ok(model_listed(&models, &self.model))
    }
}

/// Whether `model` is among `models`; a name without a tag matches any tag
fn model_listed(models: &[String], model: &str) -> bool {
    models.iter().any(|m| {
        m == model
            || m
                .strip_prefix(model)
                .is_some_and(|rest| rest.starts_with(':') && !model.contains(':'))
    })
}

#[cfg(feature = "llm-online")]
#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.body(request);

        tracing::debug!(
            url = %url,
            json = request.json_format,
            prompt_chars = request.user_content().len(),
            "Sending chat request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    LlmError::ConnectionError(format!(
                        "Failed to connect to Ollama at {}: {}",
                        self.base_url, e
                    ))
                } else {
                    LlmError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(60));
            }
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(duration) = chat.total_duration {
            tracing::debug!(
                duration_ms = duration / 1_000_000,
                prompt_tokens = chat.prompt_eval_count.unwrap_or(0),
                completion_tokens = chat.eval_count.unwrap_or(0),
                "Ollama chat completed"
            );
        }

        Ok(chat.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_ready(&self) -> bool {
        self.list_models().await.is_ok()
    }
}

#[cfg(not(feature = "llm-online"))]
#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, _request: &ChatRequest) -> LlmResult<String> {
        Err(LlmError::FeatureNotAvailable(
            "Online LLM".to_string(),
            "llm-online".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_ready(&self) -> bool {
        false
    }
}
