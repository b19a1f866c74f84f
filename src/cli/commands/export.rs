//! Export command implementation

use std::path::Path;

use crate::cli::error::CliError;
use crate::export::{ExportConfig, export_profiles, export_reviews};
use crate::pipeline::{CheckpointDocument, ReviewLedger};

/// Handle the export command
///
/// Accepts either a profiling checkpoint or a per-review ledger.
pub async fn handle_export(document: &Path, config: &ExportConfig) -> Result<(), CliError> {
    let contents = tokio::fs::read_to_string(document)
        .await
        .map_err(|e| CliError::FileReadError(document.to_path_buf(), e.to_string()))?;

    let report = if let Ok(doc) = serde_json::from_str::<CheckpointDocument>(&contents) {
        export_profiles(&doc, config)
    } else if let Ok(ledger) = serde_json::from_str::<ReviewLedger>(&contents) {
        export_reviews(&ledger, config)
    } else {
        return Err(CliError::InvalidArgument(format!(
            "{} is neither a checkpoint nor a review ledger",
            document.display()
        )));
    };

    eprintln!("Exporting to {}", config.out_dir.display());
    report.print_summary();
    Ok(())
}
