//! Status command implementation

use std::path::Path;

use crate::cli::error::CliError;
use crate::cli::output::format_document;
use crate::config::ProfilerConfig;
use crate::pipeline::source_key;

use super::checkpoint_store;

/// Handle the status command
pub async fn handle_status(config: &ProfilerConfig, source: Option<&Path>) -> Result<(), CliError> {
    let store = checkpoint_store(config);
    let key = source.map(source_key);

    match store.latest(key.as_deref()).await? {
        Some(doc) => print!("{}", format_document(&doc)),
        None => println!(
            "No sessions found in {}",
            config.pipeline.save_dir.display()
        ),
    }
    Ok(())
}
