//! LLM client trait and chat request types
//!
//! The language model is treated as an opaque chat-completion function:
//! given an ordered list of role-tagged messages it returns text, optionally
//! constrained to JSON, or it fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::LlmResult;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// One message in a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Ordered messages (system first)
    pub messages: Vec<ChatMessage>,
    /// Ask the backend to constrain output to JSON
    pub json_format: bool,
}

impl ChatRequest {
    /// Build a system + user request
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            json_format: false,
        }
    }

    /// Request JSON-formatted output
    pub fn with_json_format(mut self, json: bool) -> Self {
        self.json_format = json;
        self
    }

    /// Content of the first user message
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Trait for LLM client implementations
///
/// Implementations perform exactly one request per call and do not retry.
/// Timeouts are enforced by the caller ([`crate::llm::Oracle`]), although
/// backends are free to apply their own transport timeout as well.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat request and return the raw response text
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Check if the client is ready and connected
    async fn is_ready(&self) -> bool;
}

#[async_trait]
impl<C: LlmClient + ?Sized> LlmClient for std::sync::Arc<C> {
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        (**self).chat(request).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    async fn is_ready(&self) -> bool {
        (**self).is_ready().await
    }
}

/// A scripted LLM client for unit tests
///
/// Responses are consumed in order; once the script is exhausted the
/// fallback response is returned. Every request is recorded.
#[cfg(test)]
pub struct MockLlmClient {
    script: std::sync::Mutex<std::collections::VecDeque<LlmResult<String>>>,
    fallback: LlmResult<String>,
    requests: std::sync::Mutex<Vec<ChatRequest>>,
    model: String,
}

#[cfg(test)]
impl MockLlmClient {
    /// Create a mock client that always returns the given response
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            script: std::sync::Mutex::new(Default::default()),
            fallback: Ok(response.into()),
            requests: std::sync::Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// Create a mock client that always fails
    pub fn failing() -> Self {
        Self {
            fallback: Err(super::error::LlmError::ConnectionError(
                "Mock failure".to_string(),
            )),
            ..Self::new("")
        }
    }

    /// Queue responses to return before the fallback
    pub fn with_script(self, script: Vec<LlmResult<String>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Copy of all requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self.fallback.clone(),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_ready(&self) -> bool {
        self.fallback.is_ok()
    }
}
