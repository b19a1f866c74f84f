//! CLI error type

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use crate::source::SourceError;

/// Exit code used after an interrupt (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Interrupted; progress has been saved")]
    Interrupted,
}

impl CliError {
    pub fn user_message(&self) -> String {
        match self {
            CliError::Pipeline(err) => err.user_message(),
            CliError::Source(err) => err.user_message(),
            _ => self.to_string(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Interrupted => INTERRUPTED_EXIT_CODE,
            CliError::InvalidArgument(_) => 2,
            _ => 1,
        }
    }
}
