//! Profile command implementation

use std::path::Path;

use crate::cli::error::CliError;
use crate::config::ProfilerConfig;
use crate::export::export_profiles;
use crate::pipeline::{Interrupt, ProfilePipeline, listen_for_signals};

use super::{checkpoint_store, connect};

/// Handle the profile command
pub async fn handle_profile(source: &Path, config: &ProfilerConfig, no_export: bool) -> Result<(), CliError> {
    let oracle = connect(config).await;
    let (handle, interrupt) = Interrupt::new();
    listen_for_signals(handle);

    let mut pipeline = ProfilePipeline::new(oracle, checkpoint_store(config), config.pipeline.clone())?
        .with_interrupt(interrupt);

    let result = pipeline.run(source).await;

    // Export whatever the checkpoint holds, after a finished run or an interrupt
    let exportable = match &result {
        Ok(_) => true,
        Err(e) => e.is_cancelled(),
    };
    if exportable
        && !no_export
        && let Some(doc) = pipeline.document()
    {
        eprintln!("\nExporting to {}", config.export.out_dir.display());
        export_profiles(doc, &config.export).print_summary();
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
