//! Profile pipeline executor
//!
//! Drives a session through its phases: entities are batched, analyzed and
//! aggregated one at a time, then the global profile is built. The
//! checkpoint document is saved after every stage, so an interrupted run
//! resumes without repeating finished work.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};
use tracing::Instrument;

use super::analyze::{aggregate_entity, aggregate_global, analyze_batch};
use super::cancel::Interrupt;
use super::checkpoint::{BatchResult, CheckpointDocument, SessionPhase, SessionStatus};
use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineResult};
use super::store::{CheckpointStore, new_session_key};
use crate::llm::{LlmClient, Oracle};
use crate::source::{EntityGroups, EntityReviews, group_by_entity, load_table, make_batches};

/// Key under which a source file is matched across runs
///
/// The canonical path when the file exists, the path as given otherwise.
pub fn source_key(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Runs a profiling session against a checkpoint store
pub struct ProfilePipeline<C: LlmClient> {
    oracle: Oracle<C>,
    store: CheckpointStore,
    config: PipelineConfig,
    interrupt: Interrupt,
    doc: Option<CheckpointDocument>,
    totals: (usize, usize),
    retrying: HashSet<String>,
}

impl<C: LlmClient> ProfilePipeline<C> {
    /// Create a pipeline
    pub fn new(oracle: Oracle<C>, store: CheckpointStore, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;
        Ok(Self {
            oracle,
            store,
            config,
            interrupt: Interrupt::never(),
            doc: None,
            totals: (0, 0),
            retrying: HashSet::new(),
        })
    }

    /// Stop at the next oracle call once `interrupt` fires
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The active session document, if a run has started
    pub fn document(&self) -> Option<&CheckpointDocument> {
        self.doc.as_ref()
    }

    /// The oracle adapter
    pub fn oracle(&self) -> &Oracle<C> {
        &self.oracle
    }

    /// Persist the in-memory session document, if any
    pub async fn flush(&self) -> PipelineResult<()> {
        match &self.doc {
            Some(doc) => {
                self.store.save(doc).await?;
                info!(session = doc.session_id(), "Checkpoint flushed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Load a source file and run the session for it
    pub async fn run(&mut self, source: &Path) -> PipelineResult<PipelineReport> {
        let table = load_table(source)?;
        let groups = group_by_entity(&table, &self.config.columns)?;
        let digest = table.digest.clone();
        self.run_groups(&source_key(source), Some(digest), &groups).await
    }

    /// Run the session for already-grouped reviews
    pub async fn run_groups(
        &mut self,
        source_file: &str,
        source_digest: Option<String>,
        groups: &EntityGroups,
    ) -> PipelineResult<PipelineReport> {
        let start = Instant::now();
        let calls_before = self.oracle.calls();
        self.totals = (groups.len(), groups.total_reviews());

        let resumed = self.open_session(source_file, source_digest, groups).await?;
        let session_id = self.doc()?.session_id().to_string();

        let span = info_span!("profile_run", session = %session_id);
        async {
            let phase = self.doc()?.phase(groups);
            info!(
                source = source_file,
                entities = groups.len(),
                reviews = groups.total_reviews(),
                resumed,
                phase = %phase,
                "Starting profile session"
            );

            if self.config.verbose {
                eprintln!("Session: {session_id}{}", if resumed { " (resumed)" } else { "" });
                eprintln!(
                    "Entities: {} | Reviews: {} | Batch size: {}",
                    groups.len(),
                    groups.total_reviews(),
                    self.doc()?.session_info.batch_size
                );
            }

            let pending: Vec<&EntityReviews> = groups
                .iter()
                .filter(|g| !self.is_profiled(&g.entity))
                .collect();
            let total = groups.len();
            let done_before = total - pending.len();
            for (i, group) in pending.into_iter().enumerate() {
                if self.config.verbose {
                    eprintln!(
                        "[{}/{}] {} ({} reviews)",
                        done_before + i + 1,
                        total,
                        group.entity,
                        group.reviews.len()
                    );
                }
                self.process_entity(group).await?;
            }

            if self.doc()?.phase(groups) == SessionPhase::AggregatingGlobal {
                self.process_global(groups).await?;
            }
            Ok::<(), PipelineError>(())
        }
        .instrument(span)
        .await?;

        let duration = start.elapsed();
        let report = PipelineReport::from_document(
            self.doc()?,
            groups,
            resumed,
            self.oracle.calls() - calls_before,
            duration.as_millis() as u64,
        );
        info!(
            session = %report.session_id,
            phase = %report.phase,
            oracle_calls = report.oracle_calls,
            duration_ms = report.duration_ms,
            "Profile session finished"
        );
        Ok(report)
    }

    /// Resume a matching session or start a new one; persists if anything changed
    async fn open_session(
        &mut self,
        source_file: &str,
        source_digest: Option<String>,
        groups: &EntityGroups,
    ) -> PipelineResult<bool> {
        let existing = self.store.find_resumable(source_file).await?;
        let resumed = existing.is_some();
        self.retrying.clear();

        let (mut doc, mut dirty) = match existing {
            Some(doc) => {
                info!(session = doc.session_id(), "Resuming session");
                if let (Some(recorded), Some(current)) =
                    (&doc.session_info.source_digest, &source_digest)
                    && recorded != current
                {
                    warn!(
                        session = doc.session_id(),
                        "Source file changed since the session started; resuming anyway"
                    );
                }
                if doc.session_info.batch_size != self.config.batch_size {
                    warn!(
                        recorded = doc.session_info.batch_size,
                        configured = self.config.batch_size,
                        "Keeping the session's recorded batch size"
                    );
                }
                (doc, false)
            }
            None => {
                let mut doc = CheckpointDocument::new(
                    new_session_key(),
                    self.oracle.model_name(),
                    self.config.batch_size,
                    source_file,
                );
                doc.session_info.source_digest = source_digest;
                info!(session = doc.session_id(), "Starting new session");
                (doc, true)
            }
        };

        if doc.reconcile(groups) {
            debug!("Checkpoint reconciled with current source");
            dirty = true;
        }
        if self.config.retry_failed {
            let reset = doc.reset_failed();
            if !reset.is_empty() {
                info!(entities = ?reset, "Retrying failed entities");
                self.retrying.extend(reset);
                dirty = true;
            }
        }

        let before = doc.statistics.clone();
        doc.recompute_statistics(self.totals.0, self.totals.1);
        if doc.statistics != before {
            dirty = true;
        }

        self.doc = Some(doc);
        if dirty {
            self.flush().await?;
        }
        Ok(resumed)
    }

    async fn process_entity(&mut self, group: &EntityReviews) -> PipelineResult<()> {
        let entity = group.entity.as_str();
        let batch_size = self.doc()?.session_info.batch_size;
        let batches = make_batches(&group.reviews, batch_size);
        let retry = self.retrying.contains(entity);
        let entity_start = Instant::now();

        for (i, reviews) in batches.iter().enumerate() {
            let batch_index = i + 1;
            match self.doc()?.latest_batch(entity, batch_index) {
                Some(prev) if prev.is_success() || !retry => {
                    debug!(entity, batch_index, "Batch already recorded, skipping");
                    continue;
                }
                _ => {}
            }

            let result = self
                .interruptible(analyze_batch(&self.oracle, entity, batch_index, reviews))
                .await?;

            info!(
                entity,
                batch_index,
                batches = batches.len(),
                success = result.is_success(),
                duration_ms = (result.processing_time_seconds * 1000.0) as u64,
                "Batch analyzed"
            );
            if self.config.verbose {
                eprintln!(
                    "  batch {}/{}: {} ({:.1}s)",
                    batch_index,
                    batches.len(),
                    if result.is_success() { "ok" } else { "failed" },
                    result.processing_time_seconds
                );
            }

            self.doc_mut()?.record_batch(result);
            self.checkpoint().await?;
        }

        let doc = self.doc()?;
        let latest: Vec<&BatchResult> = (1..=batches.len())
            .filter_map(|i| doc.latest_batch(entity, i))
            .collect();
        let profile = self
            .interruptible(aggregate_entity(&self.oracle, entity, &latest, self.config.fallback))
            .await?;

        if profile.is_success() {
            info!(
                entity,
                batch_count = profile.batch_count,
                total_reviews = profile.outcome.total_reviews(),
                degraded = profile.outcome.is_degraded(),
                duration_ms = entity_start.elapsed().as_millis() as u64,
                "Entity profile completed"
            );
        } else {
            error!(
                entity,
                error = profile.outcome.error().unwrap_or_default(),
                "Entity profile failed"
            );
        }
        if self.config.verbose {
            eprintln!(
                "  profile: {}",
                if profile.is_success() { "ok" } else { "failed" }
            );
        }

        self.retrying.remove(entity);
        self.doc_mut()?.record_entity(profile);
        self.checkpoint().await
    }

    async fn process_global(&mut self, groups: &EntityGroups) -> PipelineResult<()> {
        let doc = self.doc()?;
        let profiles: Vec<_> = groups
            .iter()
            .filter_map(|g| doc.entity_profiles.get(&g.entity))
            .collect();

        if self.config.verbose {
            eprintln!("Aggregating global profile from {} entities...", profiles.len());
        }

        let global = self
            .interruptible(aggregate_global(&self.oracle, &profiles, self.config.fallback))
            .await?;

        // Without any successful entity there is nothing the oracle could fix on a rerun
        if global.is_success() || global.total_entities == 0 {
            info!(
                success = global.is_success(),
                entities = global.total_entities,
                "Global profile stored"
            );
            self.doc_mut()?.complete(global);
            self.checkpoint().await
        } else {
            error!(
                error = global.outcome.error().unwrap_or_default(),
                "Global aggregation failed; it will be retried on the next run"
            );
            Ok(())
        }
    }

    /// Race a stage against the interrupt; on interrupt flush and cancel
    async fn interruptible<T>(&self, stage: impl Future<Output = T>) -> PipelineResult<T> {
        tokio::select! {
            biased;
            _ = self.interrupt.triggered() => {
                warn!("Interrupted; saving checkpoint");
                self.flush().await?;
                Err(PipelineError::Cancelled)
            }
            value = stage => Ok(value),
        }
    }

    /// Recompute statistics and save
    async fn checkpoint(&mut self) -> PipelineResult<()> {
        let (entities, reviews) = self.totals;
        self.doc_mut()?.recompute_statistics(entities, reviews);
        self.flush().await
    }

    fn is_profiled(&self, entity: &str) -> bool {
        self.doc
            .as_ref()
            .is_some_and(|d| d.entity_profiles.contains_key(entity))
    }

    fn doc(&self) -> PipelineResult<&CheckpointDocument> {
        self.doc
            .as_ref()
            .ok_or_else(|| PipelineError::CheckpointError("no active session".to_string()))
    }

    fn doc_mut(&mut self) -> PipelineResult<&mut CheckpointDocument> {
        self.doc
            .as_mut()
            .ok_or_else(|| PipelineError::CheckpointError("no active session".to_string()))
    }
}

/// State of the global profile in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalState {
    Missing,
    Success,
    Degraded,
    Failed,
}

impl std::fmt::Display for GlobalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Success => write!(f, "success"),
            Self::Degraded => write!(f, "success (placeholder)"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Session key
    pub session_id: String,
    /// Checkpoint file name inside the save directory
    pub document: String,
    /// Whether an earlier session was resumed
    pub resumed: bool,
    /// Phase at the end of the run
    pub phase: SessionPhase,
    /// Persisted session status
    pub status: SessionStatus,
    pub entities: usize,
    pub completed_entities: usize,
    pub failed_entities: usize,
    pub degraded_entities: usize,
    pub batches: usize,
    pub successful_batches: usize,
    /// Oracle calls made during this run
    pub oracle_calls: usize,
    pub global: GlobalState,
    /// Sum of recorded processing times, in seconds
    pub total_processing_time: f64,
    /// Wall-clock duration of this run in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Summarize a document against the entity set it was run for
    pub fn from_document(
        doc: &CheckpointDocument,
        groups: &EntityGroups,
        resumed: bool,
        oracle_calls: usize,
        duration_ms: u64,
    ) -> Self {
        let global = match &doc.global_profile {
            None => GlobalState::Missing,
            Some(g) if g.outcome.is_degraded() => GlobalState::Degraded,
            Some(g) if g.is_success() => GlobalState::Success,
            Some(_) => GlobalState::Failed,
        };

        Self {
            session_id: doc.session_id().to_string(),
            document: CheckpointStore::file_name(doc.session_id()),
            resumed,
            phase: doc.phase(groups),
            status: doc.session_info.status,
            entities: groups.len(),
            completed_entities: doc.statistics.completed_entities,
            failed_entities: doc.statistics.failed_entities,
            degraded_entities: doc
                .entity_profiles
                .values()
                .filter(|p| p.outcome.is_degraded())
                .count(),
            batches: doc.batch_results.len(),
            successful_batches: doc.batch_results.iter().filter(|b| b.is_success()).count(),
            oracle_calls,
            global,
            total_processing_time: doc.statistics.total_processing_time,
            duration_ms,
        }
    }

    /// Check if the session reached its final phase
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Done
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Session {} - {}", self.session_id, self.status);
        eprintln!("Duration: {}", self.duration_formatted());
        eprintln!(
            "Entities: {}/{} profiled ({} failed, {} placeholder)",
            self.completed_entities, self.entities, self.failed_entities, self.degraded_entities
        );
        eprintln!(
            "Batches: {} recorded ({} successful)",
            self.batches, self.successful_batches
        );
        eprintln!("Oracle calls this run: {}", self.oracle_calls);
        eprintln!("Global profile: {}", self.global);
        eprintln!("Processing time: {:.1}s", self.total_processing_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::pipeline::checkpoint::ProfileOutcome;
    use crate::source::Record;
    use crate::storage::MemoryStorageBackend;
    use std::sync::Arc;
    use std::time::Duration;

    const PROFILE_JSON: &str = r#"{"summary": "s", "pros": ["p"], "cons": ["c"], "tags": ["t"]}"#;

    fn groups(counts: &[(&str, usize)]) -> EntityGroups {
        EntityGroups::from_records(counts.iter().flat_map(|(entity, n)| {
            (0..*n).filter_map(move |i| Record::new(entity, &format!("review {i} of {entity}")))
        }))
    }

    fn pipeline(
        client: MockLlmClient,
        backend: Arc<MemoryStorageBackend>,
        config: PipelineConfig,
    ) -> ProfilePipeline<MockLlmClient> {
        ProfilePipeline::new(
            Oracle::new(client, Duration::from_secs(5)),
            CheckpointStore::new(backend),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = ProfilePipeline::new(
            Oracle::new(MockLlmClient::new(""), Duration::from_secs(1)),
            CheckpointStore::new(Arc::new(MemoryStorageBackend::new())),
            PipelineConfig::new().with_batch_size(0),
        );
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_full_run_twenty_five_reviews() {
        let backend = Arc::new(MemoryStorageBackend::new());
        // batch 1, batch 2, entity aggregation, global aggregation
        let client = MockLlmClient::new(PROFILE_JSON)
            .with_script(vec![Ok("analysis one".into()), Ok("analysis two".into())]);
        let mut p = pipeline(client, backend.clone(), PipelineConfig::new());

        let report = p.run_groups("r.csv", None, &groups(&[("A", 25)])).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.oracle_calls, 4);
        assert_eq!(report.batches, 2);
        let doc = p.document().unwrap();
        let profile = &doc.entity_profiles["A"];
        assert_eq!(profile.batch_count, 2);
        assert_eq!(profile.outcome.total_reviews(), 25);
        assert_eq!(doc.batch_results[0].review_count, 20);
        assert_eq!(doc.batch_results[1].review_count, 5);
        assert!(doc.is_completed());
        assert_eq!(doc.statistics.analyzed_reviews, 25);
    }

    #[tokio::test]
    async fn test_done_session_is_idempotent() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let g = groups(&[("A", 3), ("B", 2)]);
        let mut first = pipeline(MockLlmClient::new(PROFILE_JSON), backend.clone(), PipelineConfig::new());
        first.run_groups("r.csv", None, &g).await.unwrap();
        let saved = first.document().unwrap().clone();
        let writes = backend.write_count();

        let client = MockLlmClient::new(PROFILE_JSON);
        let mut second = pipeline(client, backend.clone(), PipelineConfig::new());
        let report = second.run_groups("r.csv", None, &g).await.unwrap();

        assert!(report.resumed);
        assert_eq!(report.oracle_calls, 0);
        assert_eq!(second.oracle().client().calls(), 0);
        assert_eq!(backend.write_count(), writes);
        assert_eq!(second.document().unwrap(), &saved);
    }

    #[tokio::test]
    async fn test_batch_timeout_does_not_abort_entity() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let client = MockLlmClient::new(PROFILE_JSON).with_script(vec![
            Ok("b1".into()),
            Err(LlmError::Timeout(300)),
            Ok("b3".into()),
        ]);
        let mut p = pipeline(client, backend, PipelineConfig::new().with_batch_size(2));

        p.run_groups("r.csv", None, &groups(&[("B", 5)])).await.unwrap();

        let doc = p.document().unwrap();
        let statuses: Vec<bool> = doc.batch_results.iter().map(|b| b.is_success()).collect();
        assert_eq!(statuses, vec![true, false, true]);
        let profile = &doc.entity_profiles["B"];
        assert!(profile.is_success());
        assert_eq!(profile.batch_count, 2);
        assert_eq!(profile.outcome.total_reviews(), 3);
    }

    #[tokio::test]
    async fn test_all_batches_failed_excluded_from_global() {
        let backend = Arc::new(MemoryStorageBackend::new());
        // A: one failed batch (no entity call); B: batch + entity; global
        let client = MockLlmClient::new(PROFILE_JSON).with_script(vec![
            Err(LlmError::ConnectionError("down".into())),
            Ok("b analysis".into()),
        ]);
        let mut p = pipeline(client, backend, PipelineConfig::new());

        let report = p
            .run_groups("r.csv", None, &groups(&[("A", 2), ("B", 2)]))
            .await
            .unwrap();

        assert_eq!(report.failed_entities, 1);
        let doc = p.document().unwrap();
        assert!(!doc.entity_profiles["A"].is_success());
        let global = doc.global_profile.as_ref().unwrap();
        assert_eq!(global.total_entities, 1);
        let last = p.oracle().client().requests().last().unwrap().user_content().to_string();
        assert!(last.contains("Game: B"));
        assert!(!last.contains("Game: A"));
    }

    #[tokio::test]
    async fn test_failed_global_is_not_persisted() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let client = MockLlmClient::new("").with_script(vec![
            Ok("analysis".into()),
            Ok(PROFILE_JSON.into()),
            Err(LlmError::Timeout(300)),
        ]);
        let mut p = pipeline(client, backend.clone(), PipelineConfig::new());
        let g = groups(&[("A", 1)]);

        let report = p.run_groups("r.csv", None, &g).await.unwrap();
        assert_eq!(report.global, GlobalState::Missing);
        assert_eq!(report.phase, SessionPhase::AggregatingGlobal);
        assert_eq!(report.status, SessionStatus::InProgress);

        // Next run only retries the global step
        let mut again = pipeline(MockLlmClient::new(PROFILE_JSON), backend, PipelineConfig::new());
        let report = again.run_groups("r.csv", None, &g).await.unwrap();
        assert_eq!(report.oracle_calls, 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_resume_skips_profiled_entities() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let g = groups(&[("A", 2), ("B", 2)]);

        // First run: A completes, interrupt fires during B's first batch
        let (handle, interrupt) = Interrupt::new();
        let store = CheckpointStore::new(backend.clone());
        let mut doc = CheckpointDocument::new("profiles_1", "mock-model", 20, "r.csv");
        doc.record_entity(crate::pipeline::checkpoint::EntityProfile {
            entity: "A".to_string(),
            batch_count: 1,
            processing_time_seconds: 1.0,
            outcome: ProfileOutcome::Success {
                total_reviews: 2,
                summary: "a".to_string(),
                pros: vec![],
                cons: vec![],
                tags: vec![],
                degraded: false,
            },
        });
        store.save(&doc).await.unwrap();
        handle.trigger();

        let mut p = pipeline(MockLlmClient::new(PROFILE_JSON), backend.clone(), PipelineConfig::new())
            .with_interrupt(interrupt);
        let err = p.run_groups("r.csv", None, &g).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(p.oracle().client().calls(), 0);

        // Second run finishes B only
        let mut p = pipeline(MockLlmClient::new(PROFILE_JSON), backend, PipelineConfig::new());
        let report = p.run_groups("r.csv", None, &g).await.unwrap();
        assert!(report.resumed);
        assert_eq!(report.session_id, "profiles_1");
        // B batch, B aggregation, global
        assert_eq!(report.oracle_calls, 3);
        assert!(
            p.oracle()
                .client()
                .requests()
                .iter()
                .all(|r| !r.user_content().contains("Game: A\n"))
        );
    }

    #[tokio::test]
    async fn test_retry_failed_reruns_failed_batches_only() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let g = groups(&[("A", 3)]);
        let config = PipelineConfig::new().with_batch_size(2);

        let client = MockLlmClient::failing();
        let mut p = pipeline(client, backend.clone(), config.clone());
        p.run_groups("r.csv", None, &g).await.unwrap();
        assert!(!p.document().unwrap().entity_profiles["A"].is_success());

        let mut p = pipeline(
            MockLlmClient::new(PROFILE_JSON),
            backend,
            config.with_retry_failed(true),
        );
        let report = p.run_groups("r.csv", None, &g).await.unwrap();

        // two batches rerun, entity aggregation, global
        assert_eq!(report.oracle_calls, 4);
        let doc = p.document().unwrap();
        assert!(doc.entity_profiles["A"].is_success());
        assert_eq!(doc.batch_results.len(), 4);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_resumed_session_keeps_batch_size() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let store = CheckpointStore::new(backend.clone());
        store
            .save(&CheckpointDocument::new("profiles_1", "m", 2, "r.csv"))
            .await
            .unwrap();

        let mut p = pipeline(
            MockLlmClient::new(PROFILE_JSON),
            backend,
            PipelineConfig::new().with_batch_size(20),
        );
        p.run_groups("r.csv", None, &groups(&[("A", 5)])).await.unwrap();
        assert_eq!(p.document().unwrap().batch_results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_source_completes_without_calls() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let mut p = pipeline(MockLlmClient::new(PROFILE_JSON), backend, PipelineConfig::new());
        let report = p.run_groups("r.csv", None, &EntityGroups::default()).await.unwrap();

        assert_eq!(report.oracle_calls, 0);
        assert_eq!(report.global, GlobalState::Failed);
        assert!(report.is_complete());
    }

    #[test]
    fn test_pipeline_report_duration() {
        let doc = CheckpointDocument::new("profiles_1", "m", 20, "r.csv");
        let report = PipelineReport::from_document(&doc, &EntityGroups::default(), false, 0, 65000);
        assert_eq!(report.duration_formatted(), "1m 5s");
        assert_eq!(report.document, "profiles_1.json");
    }
}
