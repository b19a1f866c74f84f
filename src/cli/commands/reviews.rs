//! Reviews command implementation

use std::path::Path;

use crate::cli::error::CliError;
use crate::config::ProfilerConfig;
use crate::export::export_reviews;
use crate::pipeline::{Interrupt, ReviewPipeline, listen_for_signals};

use super::{checkpoint_store, connect};

/// Handle the reviews command
pub async fn handle_reviews(source: &Path, config: &ProfilerConfig, no_export: bool) -> Result<(), CliError> {
    let oracle = connect(config).await;
    let (handle, interrupt) = Interrupt::new();
    listen_for_signals(handle);

    let mut pipeline = ReviewPipeline::new(oracle, checkpoint_store(config), config.pipeline.clone())?
        .with_interrupt(interrupt);

    let result = pipeline.run(source).await;

    let exportable = match &result {
        Ok(_) => true,
        Err(e) => e.is_cancelled(),
    };
    if exportable
        && !no_export
        && let Some(ledger) = pipeline.ledger()
    {
        eprintln!("\nExporting to {}", config.export.out_dir.display());
        export_reviews(ledger, &config.export).print_summary();
    }

    match result {
        Ok(report) => {
            report.print_summary();
            Ok(())
        }
        Err(e) if e.is_cancelled() => Err(CliError::Interrupted),
        Err(e) => Err(e.into()),
    }
}
