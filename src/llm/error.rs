//! Error types for LLM operations
//!
//! Every failure of the text-generation endpoint is expressed as an
//! [`LlmError`]. The pipeline never lets these escape a batch or an
//! aggregation step; they are downgraded to `failed` results instead.

use thiserror::Error;

/// Errors that can occur while talking to the language model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Failed to connect to LLM service: {0}")]
    ConnectionError(String),

    /// Request timeout
    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success response from the service
    #[error("LLM service returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Rate limiting
    #[error("Rate limited by LLM service, retry after {0} seconds")]
    RateLimited(u64),

    /// Invalid response envelope from the service
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Failed to parse LLM output as JSON
    #[error("Failed to parse LLM output as JSON: {0}")]
    ParseError(String),

    /// Parsed output does not have the expected shape
    #[error("LLM output validation failed: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Feature not available
    #[error("LLM feature not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ConnectionError(msg) => {
                format!(
                    "Failed to connect to LLM service: {msg}\n\n\
                    Hints:\n\
                    - Verify the endpoint URL (--llm-url)\n\
                    - For Ollama: ensure 'ollama serve' is running"
                )
            }
            LlmError::Timeout(secs) => {
                format!(
                    "LLM request timed out after {secs} seconds.\n\n\
                    Hints:\n\
                    - The model may be overloaded, try again later\n\
                    - Use a smaller batch size (--batch-size)\n\
                    - Increase timeout with --timeout"
                )
            }
            LlmError::RateLimited(secs) => {
                format!("Rate limited by LLM service. Retry after {secs} seconds.")
            }
            LlmError::FeatureNotAvailable(feature, flag) => {
                format!(
                    "LLM feature '{feature}' not available.\n\n\
                    Hint: Rebuild with --features {flag}"
                )
            }
            _ => self.to_string(),
        }
    }

    /// Check if this error comes from the transport rather than the content
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ConnectionError(_) | LlmError::Timeout(_) | LlmError::RateLimited(_)
        )
    }

    /// Whether the model answered but the structured output was unusable
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, LlmError::ParseError(_) | LlmError::ValidationError(_))
    }
}
