//! CLI module for the review-profiler binary

pub mod commands;
pub mod error;
pub mod output;

pub use commands::{Cli, run};
pub use error::CliError;

/// Check if verbose mode is enabled (for early logging setup)
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Check if quiet mode is enabled (for early logging setup)
pub fn is_quiet() -> bool {
    std::env::args().any(|arg| arg == "-q" || arg == "--quiet")
}
