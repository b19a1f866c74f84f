//! Sources command implementation

use std::path::Path;

use crate::cli::error::CliError;
use crate::source::{SourceError, list_sources};

/// Handle the sources command
pub fn handle_sources(data_dir: &Path) -> Result<(), CliError> {
    if !data_dir.is_dir() {
        return Err(SourceError::FileNotFound(data_dir.to_path_buf()).into());
    }
    let files = list_sources(data_dir)?;

    if files.is_empty() {
        println!("No source files in {}", data_dir.display());
        return Ok(());
    }

    println!("Source files in {}:", data_dir.display());
    for (i, path) in files.iter().enumerate() {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!("  {}. {} ({:.1} KB)", i + 1, path.display(), size as f64 / 1024.0);
    }
    Ok(())
}
