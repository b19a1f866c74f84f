//! Per-review analysis mode
//!
//! Every review gets its own structured oracle call. Results are appended
//! to a ledger document that is saved after each review; reviews already in
//! the ledger are skipped on the next run.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::cancel::Interrupt;
use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::executor::source_key;
use super::store::CheckpointStore;
use crate::llm::prompt::{self, truncate_chars};
use crate::llm::{LlmClient, Oracle};
use crate::source::{EntityGroups, group_by_entity, load_table};

/// Structured analysis of one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAnalysis {
    pub entity: String,
    /// Review text as sent to the model (truncated)
    pub review: String,
    pub summary: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Persisted results of per-review analysis for one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLedger {
    pub source_file: String,
    pub model_id: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub results: Vec<ReviewAnalysis>,
}

impl ReviewLedger {
    pub fn new(source_file: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            model_id: model_id.into(),
            updated_at: Utc::now(),
            results: Vec::new(),
        }
    }

    /// Keys of reviews already analyzed
    fn processed(&self) -> HashSet<(String, String)> {
        self.results
            .iter()
            .map(|r| (r.entity.clone(), r.review.clone()))
            .collect()
    }
}

/// Ledger file name for a source file: `<stem>_<hash>_review_analysis.json`
pub fn ledger_name(source: &Path) -> String {
    format!("{}_review_analysis.json", ledger_stem(&source_key(source)))
}

/// `<file stem>_<hash>` for a source key
///
/// The hash is the first 8 hex digits of the key's SHA-256, so files with
/// the same name in different directories get separate ledgers and exports.
pub fn ledger_stem(source_file: &str) -> String {
    let stem = Path::new(source_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reviews".to_string());
    let hash = format!("{:x}", Sha256::digest(source_file.as_bytes()));
    format!("{stem}_{}", &hash[..8])
}

/// Report from a per-review run
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReport {
    pub ledger: String,
    pub total_reviews: usize,
    /// Already in the ledger before this run
    pub skipped: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub oracle_calls: usize,
    pub duration_ms: u64,
}

impl ReviewReport {
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Ledger: {}", self.ledger);
        eprintln!(
            "Reviews: {} total, {} analyzed, {} skipped, {} failed",
            self.total_reviews, self.analyzed, self.skipped, self.failed
        );
        eprintln!("Oracle calls this run: {}", self.oracle_calls);
        eprintln!("Duration: {:.1}s", self.duration_ms as f64 / 1000.0);
    }
}

/// Runs per-review analysis against a ledger document
pub struct ReviewPipeline<C: LlmClient> {
    oracle: Oracle<C>,
    store: CheckpointStore,
    config: PipelineConfig,
    interrupt: Interrupt,
    ledger_name: String,
    ledger: Option<ReviewLedger>,
}

impl<C: LlmClient> ReviewPipeline<C> {
    pub fn new(oracle: Oracle<C>, store: CheckpointStore, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;
        Ok(Self {
            oracle,
            store,
            config,
            interrupt: Interrupt::never(),
            ledger_name: String::new(),
            ledger: None,
        })
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The active ledger, if a run has started
    pub fn ledger(&self) -> Option<&ReviewLedger> {
        self.ledger.as_ref()
    }

    pub fn oracle(&self) -> &Oracle<C> {
        &self.oracle
    }

    /// Persist the in-memory ledger, if any
    pub async fn flush(&self) -> PipelineResult<()> {
        if let Some(ledger) = &self.ledger {
            self.store.save_json(&self.ledger_name, ledger).await?;
        }
        Ok(())
    }

    /// Load a source file and analyze its reviews
    pub async fn run(&mut self, source: &Path) -> PipelineResult<ReviewReport> {
        let table = load_table(source)?;
        let groups = group_by_entity(&table, &self.config.columns)?;
        self.run_groups(&ledger_name(source), &source_key(source), &groups)
            .await
    }

    /// Analyze already-grouped reviews into the named ledger
    pub async fn run_groups(
        &mut self,
        ledger_name: &str,
        source_file: &str,
        groups: &EntityGroups,
    ) -> PipelineResult<ReviewReport> {
        let start = Instant::now();
        let calls_before = self.oracle.calls();
        self.ledger_name = ledger_name.to_string();

        let ledger = match self.store.load_json::<ReviewLedger>(ledger_name).await? {
            Some(ledger) => {
                info!(ledger = ledger_name, done = ledger.results.len(), "Resuming review ledger");
                ledger
            }
            None => ReviewLedger::new(source_file, self.oracle.model_name()),
        };
        let mut processed = ledger.processed();
        self.ledger = Some(ledger);

        let total = groups.total_reviews();
        let (mut skipped, mut analyzed, mut failed) = (0, 0, 0);
        let mut position = 0;

        for group in groups.iter() {
            for review in &group.reviews {
                position += 1;
                let text = truncate_chars(review, prompt::MAX_REVIEW_CHARS);
                let key = (group.entity.clone(), text.to_string());
                if processed.contains(&key) {
                    skipped += 1;
                    continue;
                }

                let user = prompt::review_prompt(&group.entity, review);
                let result = self
                    .interruptible(
                        self.oracle
                            .complete_structured(prompt::REVIEW_SYSTEM_PROMPT, &user),
                    )
                    .await?;

                match result {
                    Ok(timed) => {
                        let profile = timed.value;
                        debug!(
                            entity = %group.entity,
                            position,
                            duration_ms = timed.elapsed.as_millis() as u64,
                            "Review analyzed"
                        );
                        if let Some(ledger) = self.ledger.as_mut() {
                            ledger.results.push(ReviewAnalysis {
                                entity: group.entity.clone(),
                                review: key.1.clone(),
                                summary: profile.summary,
                                pros: profile.pros,
                                cons: profile.cons,
                                tags: profile.tags,
                            });
                            ledger.updated_at = Utc::now();
                        }
                        processed.insert(key);
                        self.flush().await?;
                        analyzed += 1;
                    }
                    Err(e) => {
                        warn!(entity = %group.entity, position, error = %e, "Review analysis failed");
                        failed += 1;
                    }
                }

                if self.config.verbose {
                    eprintln!("[{position}/{total}] {}", group.entity);
                }
            }
        }

        let report = ReviewReport {
            ledger: ledger_name.to_string(),
            total_reviews: total,
            skipped,
            analyzed,
            failed,
            oracle_calls: self.oracle.calls() - calls_before,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            ledger = ledger_name,
            analyzed, skipped, failed, "Review analysis finished"
        );
        Ok(report)
    }

    async fn interruptible<T>(&self, stage: impl Future<Output = T>) -> PipelineResult<T> {
        tokio::select! {
            biased;
            _ = self.interrupt.triggered() => {
                warn!("Interrupted; saving review ledger");
                self.flush().await?;
                Err(PipelineError::Cancelled)
            }
            value = stage => Ok(value),
        }
    }
}
