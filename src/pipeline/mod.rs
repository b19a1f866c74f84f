//! Review profiling pipeline
//!
//! Orchestrates the session: reviews are grouped per entity, split into
//! batches, analyzed, aggregated into entity profiles and finally into one
//! global profile. Every stage is persisted before the next one starts.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use review_profiler::llm::{OllamaClient, Oracle};
//! use review_profiler::pipeline::{CheckpointStore, PipelineConfig, ProfilePipeline};
//! use review_profiler::storage::FileSystemStorageBackend;
//!
//! let oracle = Oracle::new(OllamaClient::new("http://localhost:11434", "llama3.2"), Duration::from_secs(300));
//! let store = CheckpointStore::new(Arc::new(FileSystemStorageBackend::new("save")));
//! let mut pipeline = ProfilePipeline::new(oracle, store, PipelineConfig::new())?;
//! let report = pipeline.run("data/reviews.csv".as_ref()).await?;
//! report.print_summary();
//! ```
//!
//! # Resumption
//!
//! A run looks for the most recent session of the same source file in the
//! save directory. Entities that already have a profile are skipped, and a
//! present global profile means nothing is left to do.

mod analyze;
mod cancel;
mod checkpoint;
mod config;
mod error;
mod executor;
mod reviews;
mod store;

pub use analyze::{aggregate_entity, aggregate_global, analyze_batch};
pub use cancel::{Interrupt, InterruptHandle, listen_for_signals};
pub use checkpoint::{
    BatchOutcome, BatchResult, CheckpointDocument, EntityProfile, GlobalProfile, ProfileOutcome,
    SessionInfo, SessionPhase, SessionStatus, Statistics,
};
pub use config::{AggregationFallback, DEFAULT_BATCH_SIZE, DEFAULT_SAVE_DIR, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use executor::{GlobalState, PipelineReport, ProfilePipeline, source_key};
pub use reviews::{ReviewAnalysis, ReviewLedger, ReviewPipeline, ReviewReport, ledger_name, ledger_stem};
pub use store::{CheckpointStore, SESSION_PREFIX, new_session_key};
