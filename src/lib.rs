//! Review Profiler - checkpointed user profiling of game reviews
//!
//! Provides:
//! - Source loading and grouping of reviews per game (CSV, JSON, JSON Lines)
//! - Batch analysis and profile aggregation through a local LLM
//! - Resumable sessions persisted through storage backends
//! - Per-review analysis mode
//! - Tabular export with fallback locations

pub mod config;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod source;
pub mod storage;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::{ConfigError, ProfilerConfig};
pub use export::{ExportConfig, ExportReport, export_profiles, export_reviews};
pub use llm::{LlmClient, LlmConfig, LlmError, OllamaClient, Oracle};
pub use pipeline::{
    CheckpointDocument, CheckpointStore, Interrupt, PipelineConfig, PipelineError, PipelineReport,
    ProfilePipeline, ReviewPipeline,
};
pub use source::{EntityGroups, SourceColumns, SourceError};
pub use storage::{FileSystemStorageBackend, MemoryStorageBackend, StorageBackend, StorageError};
