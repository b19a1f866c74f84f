//! Export functionality
//!
//! Flattens checkpoint documents and review ledgers into tables and writes
//! them as spreadsheets. Each table has its own degrade chain (see
//! [`write_with_fallback`]); the public entry points never return an error.

mod tabular;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    BatchOutcome, CheckpointDocument, GlobalProfile, ProfileOutcome, ReviewLedger, ledger_stem,
};

pub use tabular::{
    SHEET_NAME, Table, TableOutcome, WriteTarget, write_csv, write_with_fallback, write_xlsx,
};

/// Default export directory
pub const DEFAULT_OUT_DIR: &str = "output";

/// Separator for list-valued cells
pub const LIST_SEPARATOR: &str = "; ";

/// Error during export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
        }
    }
}

impl ExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }
}

/// Result of an export run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub tables: Vec<TableOutcome>,
}

impl ExportReport {
    /// Whether every table reached some location
    pub fn is_complete(&self) -> bool {
        self.tables.iter().all(|t| t.is_written())
    }

    pub fn print_summary(&self) {
        for table in &self.tables {
            match &table.written {
                Some((path, target)) => eprintln!(
                    "  {} ({} rows) -> {}{}",
                    table.name,
                    table.rows,
                    path.display(),
                    match target {
                        WriteTarget::Primary => String::new(),
                        other => format!(" [{other}]"),
                    }
                ),
                None => eprintln!("  {} ({} rows) -> not written", table.name, table.rows),
            }
        }
    }
}

/// Export the profiles and batch results of a checkpoint document
///
/// Writes `<session>_entities`, `<session>_global` and `<session>_batches`.
pub fn export_profiles(doc: &CheckpointDocument, config: &ExportConfig) -> ExportReport {
    let prefix = doc.session_id();
    let tables = [
        entity_table(prefix, doc),
        global_table(prefix, doc.global_profile.as_ref()),
        batch_table(prefix, doc),
    ];
    write_all(&tables, config)
}

/// Export a per-review ledger
///
/// Writes `<stem>_analysis` (one row per review) and `<stem>_tags` (one row
/// per review and tag), where `<stem>` is the ledger's [`ledger_stem`].
pub fn export_reviews(ledger: &ReviewLedger, config: &ExportConfig) -> ExportReport {
    let stem = ledger_stem(&ledger.source_file);

    let mut basic = Table::new(
        format!("{stem}_analysis"),
        vec!["id", "entity", "review", "summary", "pros", "cons", "tags"],
    );
    let mut tags = Table::new(format!("{stem}_tags"), vec!["id", "entity", "tag"]);

    for (i, r) in ledger.results.iter().enumerate() {
        let id = (i + 1).to_string();
        basic.push(vec![
            id.clone(),
            r.entity.clone(),
            r.review.clone(),
            r.summary.clone(),
            join(&r.pros),
            join(&r.cons),
            join(&r.tags),
        ]);
        for tag in r.tags.iter().filter(|t| !t.trim().is_empty()) {
            tags.push(vec![id.clone(), r.entity.clone(), tag.trim().to_string()]);
        }
    }

    write_all(&[basic, tags], config)
}

fn write_all(tables: &[Table], config: &ExportConfig) -> ExportReport {
    ExportReport {
        tables: tables
            .iter()
            .map(|t| write_with_fallback(t, &config.out_dir))
            .collect(),
    }
}

fn join(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

const PROFILE_HEADERS: [&str; 8] = [
    "status",
    "total_reviews",
    "summary",
    "pros",
    "cons",
    "tags",
    "degraded",
    "error",
];

/// Cells for a profile outcome, in `PROFILE_HEADERS` order
fn outcome_cells(outcome: &ProfileOutcome) -> Vec<String> {
    match outcome {
        ProfileOutcome::Success {
            total_reviews,
            summary,
            pros,
            cons,
            tags,
            degraded,
        } => vec![
            "success".to_string(),
            total_reviews.to_string(),
            summary.clone(),
            join(pros),
            join(cons),
            join(tags),
            degraded.to_string(),
            String::new(),
        ],
        ProfileOutcome::Failed { error } => {
            let mut cells = vec!["failed".to_string()];
            cells.resize(PROFILE_HEADERS.len() - 1, String::new());
            cells.push(error.clone());
            cells
        }
    }
}

fn entity_table(prefix: &str, doc: &CheckpointDocument) -> Table {
    let mut headers = vec!["entity", "batch_count", "processing_time_seconds"];
    headers.extend(PROFILE_HEADERS);
    let mut table = Table::new(format!("{prefix}_entities"), headers);

    for profile in doc.entity_profiles.values() {
        let mut row = vec![
            profile.entity.clone(),
            profile.batch_count.to_string(),
            format!("{:.2}", profile.processing_time_seconds),
        ];
        row.extend(outcome_cells(&profile.outcome));
        table.push(row);
    }
    table
}

fn global_table(prefix: &str, global: Option<&GlobalProfile>) -> Table {
    let mut headers = vec!["total_entities", "processing_time_seconds"];
    headers.extend(PROFILE_HEADERS);
    let mut table = Table::new(format!("{prefix}_global"), headers);

    if let Some(global) = global {
        let mut row = vec![
            global.total_entities.to_string(),
            format!("{:.2}", global.processing_time_seconds),
        ];
        row.extend(outcome_cells(&global.outcome));
        table.push(row);
    }
    table
}

fn batch_table(prefix: &str, doc: &CheckpointDocument) -> Table {
    let mut table = Table::new(
        format!("{prefix}_batches"),
        vec![
            "entity",
            "batch_index",
            "review_count",
            "processing_time_seconds",
            "status",
            "analysis_text",
            "error",
        ],
    );

    for batch in &doc.batch_results {
        let (status, text, error) = match &batch.outcome {
            BatchOutcome::Success { analysis_text } => ("success", analysis_text.clone(), String::new()),
            BatchOutcome::Failed { error } => ("failed", String::new(), error.clone()),
        };
        table.push(vec![
            batch.entity.clone(),
            batch.batch_index.to_string(),
            batch.review_count.to_string(),
            format!("{:.2}", batch.processing_time_seconds),
            status.to_string(),
            text,
            error,
        ]);
    }
    table
}
