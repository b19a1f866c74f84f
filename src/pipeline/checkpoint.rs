//! Checkpoint document and result types
//!
//! The [`CheckpointDocument`] is the single persisted record of a profiling
//! session. Results are tagged variants (`status: success | failed`) so a
//! failed result carries its error and nothing else.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::EntityGroups;

/// Session lifecycle status as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Where a session stands relative to the current source data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Some entities have no profile yet
    Processing,
    /// Every entity has a profile, the global profile is missing
    AggregatingGlobal,
    /// Global profile present
    Done,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::AggregatingGlobal => write!(f, "aggregating_global"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session key; also the document's file stem
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    pub model_id: String,
    pub batch_size: usize,
    pub source_file: String,
    /// SHA-256 of the source file when the session started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
    pub status: SessionStatus,
}

/// Running statistics, recomputed after every stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Entities in the source
    pub total_entities: usize,
    /// Valid reviews in the source
    pub total_reviews: usize,
    /// Reviews covered by successful entity profiles
    pub analyzed_reviews: usize,
    /// Entities with a profile (successful or failed)
    pub completed_entities: usize,
    /// Entities whose profile failed
    pub failed_entities: usize,
    /// Sum of all recorded processing times, in seconds
    pub total_processing_time: f64,
}

/// Outcome of one batch analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Success { analysis_text: String },
    Failed { error: String },
}

/// Result of analyzing one batch of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub entity: String,
    /// 1-based, sequential per entity
    pub batch_index: usize,
    pub review_count: usize,
    pub processing_time_seconds: f64,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }

    /// Analysis text, or the error text for a failed batch
    pub fn analysis_text(&self) -> &str {
        match &self.outcome {
            BatchOutcome::Success { analysis_text } => analysis_text,
            BatchOutcome::Failed { error } => error,
        }
    }
}

/// Outcome of an aggregation step (entity or global)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProfileOutcome {
    Success {
        total_reviews: usize,
        summary: String,
        pros: Vec<String>,
        cons: Vec<String>,
        tags: Vec<String>,
        /// Synthesized because the model's answer could not be parsed
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        degraded: bool,
    },
    Failed {
        error: String,
    },
}

impl ProfileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProfileOutcome::Success { .. })
    }

    /// Reviews covered, zero for a failed profile
    pub fn total_reviews(&self) -> usize {
        match self {
            ProfileOutcome::Success { total_reviews, .. } => *total_reviews,
            ProfileOutcome::Failed { .. } => 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ProfileOutcome::Success { degraded: true, .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ProfileOutcome::Failed { error } => Some(error),
            ProfileOutcome::Success { .. } => None,
        }
    }
}

/// Aggregated profile of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    pub entity: String,
    /// Successful batches that fed the aggregation
    pub batch_count: usize,
    pub processing_time_seconds: f64,
    #[serde(flatten)]
    pub outcome: ProfileOutcome,
}

impl EntityProfile {
    pub fn failed(entity: impl Into<String>, batch_count: usize, error: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            batch_count,
            processing_time_seconds: 0.0,
            outcome: ProfileOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Aggregated profile across all entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalProfile {
    /// Successful entity profiles that fed the aggregation
    pub total_entities: usize,
    pub processing_time_seconds: f64,
    #[serde(flatten)]
    pub outcome: ProfileOutcome,
}

impl GlobalProfile {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// The persisted state of one profiling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDocument {
    pub session_info: SessionInfo,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub entity_profiles: BTreeMap<String, EntityProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_profile: Option<GlobalProfile>,
    #[serde(default)]
    pub batch_results: Vec<BatchResult>,
}

impl CheckpointDocument {
    /// Create an empty document for a new session
    pub fn new(
        session_id: impl Into<String>,
        model_id: impl Into<String>,
        batch_size: usize,
        source_file: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_info: SessionInfo {
                session_id: session_id.into(),
                created_at: now,
                updated_at: now,
                model_id: model_id.into(),
                batch_size,
                source_file: source_file.into(),
                source_digest: None,
                status: SessionStatus::InProgress,
            },
            statistics: Statistics::default(),
            entity_profiles: BTreeMap::new(),
            global_profile: None,
            batch_results: Vec::new(),
        }
    }

    /// Record the source digest
    pub fn with_source_digest(mut self, digest: impl Into<String>) -> Self {
        self.session_info.source_digest = Some(digest.into());
        self
    }

    /// Session key
    pub fn session_id(&self) -> &str {
        &self.session_info.session_id
    }

    /// Whether the session has finished
    pub fn is_completed(&self) -> bool {
        self.session_info.status == SessionStatus::Completed
    }

    /// Phase of the session relative to the current entity set
    pub fn phase(&self, groups: &EntityGroups) -> SessionPhase {
        if !self.covers(groups) {
            SessionPhase::Processing
        } else if self.global_profile.is_none() {
            SessionPhase::AggregatingGlobal
        } else {
            SessionPhase::Done
        }
    }

    /// Whether every current entity has a profile
    pub fn covers(&self, groups: &EntityGroups) -> bool {
        groups
            .iter()
            .all(|g| self.entity_profiles.contains_key(&g.entity))
    }

    /// Batch results recorded for one entity, in order
    pub fn batches_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a BatchResult> {
        self.batch_results.iter().filter(move |b| b.entity == entity)
    }

    /// Most recent result for one batch of one entity
    pub fn latest_batch(&self, entity: &str, batch_index: usize) -> Option<&BatchResult> {
        self.batch_results
            .iter()
            .rev()
            .find(|b| b.entity == entity && b.batch_index == batch_index)
    }

    /// Append a batch result
    pub fn record_batch(&mut self, result: BatchResult) {
        self.batch_results.push(result);
        self.touch();
    }

    /// Store an entity profile, replacing any earlier one for that entity
    ///
    /// A new entity profile invalidates the global profile.
    pub fn record_entity(&mut self, profile: EntityProfile) {
        self.entity_profiles.insert(profile.entity.clone(), profile);
        if self.global_profile.take().is_some() {
            self.session_info.status = SessionStatus::InProgress;
        }
        self.touch();
    }

    /// Store the global profile and mark the session completed
    pub fn complete(&mut self, global: GlobalProfile) {
        self.global_profile = Some(global);
        self.session_info.status = SessionStatus::Completed;
        self.touch();
    }

    /// Bring the document in line with the current entity set
    ///
    /// Removes profiles of entities that are no longer in the source and
    /// drops the global profile when any current entity lacks a profile.
    /// Returns whether anything changed.
    pub fn reconcile(&mut self, groups: &EntityGroups) -> bool {
        let before = self.entity_profiles.len();
        self.entity_profiles
            .retain(|entity, _| groups.contains(entity));
        let mut changed = self.entity_profiles.len() != before;

        if self.global_profile.is_some() && !self.covers(groups) {
            self.global_profile = None;
            self.session_info.status = SessionStatus::InProgress;
            changed = true;
        }
        if changed {
            self.touch();
        }
        changed
    }

    /// Remove failed entity profiles so they are processed again
    ///
    /// Returns the entities that were reset.
    pub fn reset_failed(&mut self) -> Vec<String> {
        let failed: Vec<String> = self
            .entity_profiles
            .iter()
            .filter(|(_, p)| !p.is_success())
            .map(|(k, _)| k.clone())
            .collect();
        for entity in &failed {
            self.entity_profiles.remove(entity);
        }
        if !failed.is_empty() {
            self.global_profile = None;
            self.session_info.status = SessionStatus::InProgress;
            self.touch();
        }
        failed
    }

    /// Recompute statistics from the document contents
    pub fn recompute_statistics(&mut self, total_entities: usize, total_reviews: usize) {
        let profiles = self.entity_profiles.values();
        let stats = &mut self.statistics;
        stats.total_entities = total_entities;
        stats.total_reviews = total_reviews;
        stats.completed_entities = self.entity_profiles.len();
        stats.failed_entities = 0;
        stats.analyzed_reviews = 0;
        let mut time = 0.0;
        for profile in profiles {
            if profile.is_success() {
                stats.analyzed_reviews += profile.outcome.total_reviews();
            } else {
                stats.failed_entities += 1;
            }
            time += profile.processing_time_seconds;
        }
        time += self
            .batch_results
            .iter()
            .map(|b| b.processing_time_seconds)
            .sum::<f64>();
        if let Some(global) = &self.global_profile {
            time += global.processing_time_seconds;
        }
        stats.total_processing_time = time;
    }

    /// Successful entity profiles
    pub fn successful_profiles(&self) -> impl Iterator<Item = &EntityProfile> {
        self.entity_profiles.values().filter(|p| p.is_success())
    }

    fn touch(&mut self) {
        self.session_info.updated_at = Utc::now();
    }
}
