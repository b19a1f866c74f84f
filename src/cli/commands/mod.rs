//! CLI commands implementation
//!
//! Parses arguments, resolves the effective configuration and dispatches to
//! the command modules.

mod export;
mod profile;
mod reviews;
mod sources;
mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::cli::error::CliError;
use crate::config::ProfilerConfig;
use crate::llm::{OllamaClient, Oracle};
use crate::pipeline::{AggregationFallback, CheckpointStore};
use crate::storage::FileSystemStorageBackend;

#[derive(Parser)]
#[command(name = "review-profiler")]
#[command(about = "Batch user profiling of game reviews through a local LLM")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true, env = "REVIEW_PROFILER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging and progress output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile every game in a source file (resumes a matching session)
    Profile {
        /// Source file (.xlsx, .xls, .csv, .json, .jsonl)
        source: PathBuf,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        run: RunArgs,
        /// Treat failed game profiles of the resumed session as pending
        #[arg(long)]
        retry_failed: bool,
    },

    /// Analyze every review individually
    Reviews {
        /// Source file (.xlsx, .xls, .csv, .json, .jsonl)
        source: PathBuf,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Show the most recent session
    Status {
        /// Checkpoint directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Only consider sessions of this source file
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Export a checkpoint or review ledger to CSV
    Export {
        /// Checkpoint document or review ledger (.json)
        document: PathBuf,
        /// Output directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// List candidate source files
    Sources {
        /// Directory to scan
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

/// Model endpoint overrides
#[derive(Args, Debug, Clone, Default)]
struct LlmArgs {
    /// Model name
    #[arg(short, long, env = "REVIEW_PROFILER_MODEL")]
    model: Option<String>,
    /// Ollama API URL
    #[arg(long, env = "REVIEW_PROFILER_LLM_URL")]
    llm_url: Option<String>,
    /// Per-call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

/// Pipeline and export overrides
#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Reviews per batch (new sessions only)
    #[arg(short, long, env = "REVIEW_PROFILER_BATCH_SIZE")]
    batch_size: Option<usize>,
    /// Checkpoint directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// Name of the game column
    #[arg(long)]
    entity_column: Option<String>,
    /// Name of the review text column
    #[arg(long)]
    text_column: Option<String>,
    /// What to do with unparseable aggregation answers: placeholder or fail
    #[arg(long)]
    fallback: Option<AggregationFallback>,
    /// Export directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
    /// Skip the export after the run
    #[arg(long)]
    no_export: bool,
}

/// Load the configuration file, if any, and apply the overrides
async fn load_settings(
    path: Option<&PathBuf>,
    llm: &LlmArgs,
    run: &RunArgs,
    verbose: bool,
) -> Result<ProfilerConfig, CliError> {
    let mut config = match path {
        Some(path) => ProfilerConfig::load(path).await?,
        None => ProfilerConfig::default(),
    };

    if let Some(model) = &llm.model {
        config.llm.model = model.clone();
    }
    if let Some(url) = &llm.llm_url {
        config.llm.url = url.clone();
    }
    if let Some(timeout) = llm.timeout {
        config.llm.timeout_seconds = timeout;
    }

    let pipeline = &mut config.pipeline;
    if let Some(size) = run.batch_size {
        pipeline.batch_size = size;
    }
    if let Some(dir) = &run.save_dir {
        pipeline.save_dir = dir.clone();
    }
    if let Some(column) = &run.entity_column {
        pipeline.columns.entity = column.clone();
    }
    if let Some(column) = &run.text_column {
        pipeline.columns.text = column.clone();
    }
    if let Some(fallback) = run.fallback {
        pipeline.fallback = fallback;
    }
    pipeline.verbose = verbose;

    if let Some(dir) = &run.out_dir {
        config.export.out_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Build the oracle, warning when the endpoint does not answer
async fn connect(config: &ProfilerConfig) -> Oracle<OllamaClient> {
    let client = OllamaClient::from_config(&config.llm);
    match client.model_available().await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(url = %config.llm.url, model = %config.llm.model, "Model not found on LLM endpoint");
            eprintln!(
                "Warning: model '{}' is not pulled on {}; run 'ollama pull {}'",
                config.llm.model, config.llm.url, config.llm.model
            );
        }
        Err(e) => {
            tracing::warn!(url = %config.llm.url, error = %e, "LLM endpoint is not reachable");
            eprintln!(
                "Warning: no answer from {}; every call will fail until it is reachable",
                config.llm.url
            );
        }
    }
    Oracle::new(client, Duration::from_secs(config.llm.timeout_seconds))
}

fn checkpoint_store(config: &ProfilerConfig) -> CheckpointStore {
    CheckpointStore::new(Arc::new(FileSystemStorageBackend::new(
        &config.pipeline.save_dir,
    )))
}

/// Parse arguments and run the selected command
pub async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Profile {
            source,
            llm,
            run,
            retry_failed,
        } => {
            let mut config = load_settings(config_path, &llm, &run, cli.verbose).await?;
            config.pipeline.retry_failed = retry_failed;
            profile::handle_profile(&source, &config, run.no_export).await
        }
        Commands::Reviews { source, llm, run } => {
            let config = load_settings(config_path, &llm, &run, cli.verbose).await?;
            reviews::handle_reviews(&source, &config, run.no_export).await
        }
        Commands::Status { save_dir, source } => {
            let run = RunArgs {
                save_dir,
                ..RunArgs::default()
            };
            let config = load_settings(config_path, &LlmArgs::default(), &run, cli.verbose).await?;
            status::handle_status(&config, source.as_deref()).await
        }
        Commands::Export { document, out_dir } => {
            let run = RunArgs {
                out_dir,
                ..RunArgs::default()
            };
            let config = load_settings(config_path, &LlmArgs::default(), &run, cli.verbose).await?;
            export::handle_export(&document, &config.export).await
        }
        Commands::Sources { data_dir } => sources::handle_sources(&data_dir),
    }
}
