//! Error types for pipeline operations
//!
//! Oracle failures never show up here: they are recorded as `failed`
//! results inside the checkpoint. What remains are input errors, storage
//! errors and interruption.

use thiserror::Error;

use crate::llm::LlmError;
use crate::source::SourceError;
use crate::storage::StorageError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Source file could not be loaded or lacks required columns
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Checkpoint storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Checkpoint document is unreadable or inconsistent
    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// LLM setup error (never raised for individual calls)
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Pipeline was cancelled
    #[error("Pipeline cancelled")]
    Cancelled,
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Whether the run stopped because of an interrupt
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your configuration file and flags.")
            }
            PipelineError::Source(err) => err.user_message(),
            PipelineError::Storage(err) => {
                format!(
                    "Checkpoint could not be written: {err}\n\nHint: Check free space and permissions of the save directory (--save-dir)."
                )
            }
            PipelineError::CheckpointError(msg) => {
                format!(
                    "Checkpoint error: {msg}\n\nHint: Move the damaged file out of the save directory to start a fresh session."
                )
            }
            PipelineError::Llm(err) => err.user_message(),
            PipelineError::Cancelled => {
                "Pipeline cancelled by user. Progress has been saved.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::ConfigError("batch size must be at least 1".to_string());
        assert!(err.to_string().contains("batch size"));

        let err: PipelineError = SourceError::MissingColumns(vec!["text".to_string()]).into();
        assert_eq!(
            err.to_string(),
            "Source is missing required column(s): text"
        );
    }

    #[test]
    fn test_from_storage() {
        let err: PipelineError = StorageError::IoError("disk full".to_string()).into();
        assert!(err.user_message().contains("--save-dir"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled() {
        let err = PipelineError::Cancelled;
        assert!(err.is_cancelled());
        assert!(err.user_message().contains("saved"));
    }
}
