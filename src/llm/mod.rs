//! Language model access
//!
//! The model is an opaque chat-completion oracle reached through the
//! [`LlmClient`] trait. [`Oracle`] adds the wait bound and structured-output
//! handling the pipeline relies on.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use review_profiler::llm::{LlmConfig, OllamaClient, Oracle, prompt};
//!
//! let config = LlmConfig::with_model("llama3.2").with_timeout(300);
//! let oracle = Oracle::new(OllamaClient::from_config(&config), Duration::from_secs(300));
//!
//! let profile = oracle
//!     .complete_structured(prompt::REVIEW_SYSTEM_PROMPT, &prompt::review_prompt("Clannad", "Great story"))
//!     .await?;
//! println!("{}", profile.value.summary);
//! ```
//!
//! # Feature Flags
//!
//! - `llm-online`: Enable the Ollama HTTP client
//!
//! Without it, [`OllamaClient`] still exists but every call returns
//! [`LlmError::FeatureNotAvailable`].

pub mod client;
pub mod config;
pub mod error;
pub mod ollama;
pub mod oracle;
pub mod prompt;

// Re-export main types
pub use client::{ChatMessage, ChatRequest, ChatRole, LlmClient};
pub use config::LlmConfig;
pub use error::{LlmError, LlmResult};
pub use ollama::OllamaClient;
pub use oracle::{Oracle, Timed};
pub use prompt::{StructuredProfile, parse_structured};

#[cfg(test)]
pub use client::MockLlmClient;
