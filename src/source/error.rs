//! Error types for source loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading the review source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Source file does not exist
    #[error("Source file not found: {0}")]
    FileNotFound(PathBuf),

    /// Extension not recognized as a tabular format
    #[error("Unsupported source format '{extension}' for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Required columns absent from the row schema
    #[error("Source is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unreadable spreadsheet workbook
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Malformed JSON or JSON Lines
    #[error("JSON error: {0}")]
    Json(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

impl SourceError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SourceError::FileNotFound(path) => format!(
                "Source file not found: {}\n\nHint: Use 'review-profiler sources' to list candidate files.",
                path.display()
            ),
            SourceError::UnsupportedFormat { extension, .. } => format!(
                "Unsupported source format '{extension}'.\n\nHint: Use a .xlsx, .xls, .csv, .json or .jsonl file."
            ),
            SourceError::MissingColumns(columns) => format!(
                "Source is missing required column(s): {}\n\nHint: Set --entity-column / --text-column to match the header row.",
                columns.join(", ")
            ),
            _ => self.to_string(),
        }
    }
}
