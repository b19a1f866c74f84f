//! review-profiler - batch user profiling of game reviews through a local LLM

use std::process::ExitCode;

use anyhow::Context;
use review_profiler::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let default_filter = if cli::is_verbose() {
        "review_profiler=debug"
    } else if cli::is_quiet() {
        "review_profiler=warn"
    } else {
        "review_profiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install the log subscriber")?;

    match cli::run().await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e @ cli::CliError::Interrupted) => {
            eprintln!("{e}");
            Ok(ExitCode::from(e.exit_code()))
        }
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
