//! Configuration for the language model endpoint

use serde::{Deserialize, Serialize};

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model name
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Configuration for the LLM endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama API URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name (e.g., "llama3.2", "qwen2.5")
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on a single request, in seconds
    ///
    /// Responses for a full batch can take minutes on local hardware.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Temperature for LLM sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window passed to the backend
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_context_tokens() -> usize {
    8192
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
            temperature: default_temperature(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

impl LlmConfig {
    /// Create a config for the given model on the default endpoint
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set maximum context tokens
    pub fn with_max_context_tokens(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name must not be empty".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("Timeout must be at least one second".to_string());
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(format!("LLM URL must be http(s): {}", self.url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.url, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.timeout_seconds, 300);
        assert!((config.temperature - 0.1).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_config_builder() {
        let config = LlmConfig::with_model("qwen2.5")
            .with_url("http://gpu-box:11434")
            .with_timeout(60)
            .with_temperature(5.0);

        assert_eq!(config.model, "qwen2.5");
        assert_eq!(config.url, "http://gpu-box:11434");
        assert_eq!(config.timeout_seconds, 60);
        assert!((config.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_llm_config_validate() {
        assert!(LlmConfig::default().with_timeout(0).validate().is_err());
        assert!(LlmConfig::with_model(" ").validate().is_err());
        assert!(LlmConfig::default().with_url("localhost").validate().is_err());
    }

    #[test]
    fn test_llm_config_partial_toml() {
        let config: LlmConfig = toml::from_str(r#"model = "mistral""#).unwrap();
        assert_eq!(config.model, "mistral");
        assert_eq!(config.timeout_seconds, 300);
    }
}
