//! Pipeline configuration types

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::source::SourceColumns;

/// Default number of reviews per batch
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default checkpoint directory
pub const DEFAULT_SAVE_DIR: &str = "save";

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reviews per batch for new sessions
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Directory holding checkpoint documents
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    /// Source column names
    #[serde(default)]
    pub columns: SourceColumns,
    /// What to do when an aggregation answer cannot be parsed
    #[serde(default)]
    pub fallback: AggregationFallback,
    /// Treat persisted failed entity profiles as pending
    #[serde(default)]
    pub retry_failed: bool,
    /// Verbose progress output
    #[serde(default)]
    pub verbose: bool,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_save_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SAVE_DIR)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            save_dir: default_save_dir(),
            columns: SourceColumns::default(),
            fallback: AggregationFallback::default(),
            retry_failed: false,
            verbose: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set checkpoint directory
    pub fn with_save_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_dir = path.into();
        self
    }

    /// Set source column names
    pub fn with_columns(mut self, columns: SourceColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Set the aggregation fallback policy
    pub fn with_fallback(mut self, fallback: AggregationFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Retry persisted failed entities
    pub fn with_retry_failed(mut self, retry: bool) -> Self {
        self.retry_failed = retry;
        self
    }

    /// Set verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be at least 1".to_string());
        }
        if self.columns.entity.trim().is_empty() || self.columns.text.trim().is_empty() {
            return Err("Entity and text column names must not be empty".to_string());
        }
        if self.columns.entity.trim() == self.columns.text.trim() {
            return Err(format!(
                "Entity and text columns must differ (both are '{}')",
                self.columns.entity
            ));
        }
        Ok(())
    }
}

/// Policy for aggregation answers that are not valid JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFallback {
    /// Synthesize a generic profile and mark it degraded
    #[default]
    Placeholder,
    /// Record the profile as failed
    Fail,
}

impl AggregationFallback {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for AggregationFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AggregationFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "placeholder" | "degrade" => Ok(Self::Placeholder),
            "fail" => Ok(Self::Fail),
            _ => Err(format!(
                "Unknown fallback policy: {s}. Valid values: placeholder, fail"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.save_dir, PathBuf::from("save"));
        assert_eq!(config.columns.entity, "游戏名称");
        assert_eq!(config.fallback, AggregationFallback::Placeholder);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new()
            .with_batch_size(5)
            .with_save_dir("/tmp/save")
            .with_columns(SourceColumns::new("game", "review"))
            .with_fallback(AggregationFallback::Fail)
            .with_retry_failed(true);

        assert_eq!(config.batch_size, 5);
        assert_eq!(config.columns.text, "review");
        assert!(config.retry_failed);
    }

    #[test]
    fn test_config_validation() {
        assert!(PipelineConfig::new().with_batch_size(0).validate().is_err());
        assert!(
            PipelineConfig::new()
                .with_columns(SourceColumns::new("", "text"))
                .validate()
                .is_err()
        );
        assert!(
            PipelineConfig::new()
                .with_columns(SourceColumns::new("x", "x"))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_fallback_parse() {
        assert_eq!(
            "Placeholder".parse::<AggregationFallback>().unwrap(),
            AggregationFallback::Placeholder
        );
        assert_eq!(
            "fail".parse::<AggregationFallback>().unwrap(),
            AggregationFallback::Fail
        );
        assert!("retry".parse::<AggregationFallback>().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            batch_size = 10
            fallback = "fail"
            [columns]
            text = "review"
            "#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.fallback, AggregationFallback::Fail);
        assert_eq!(config.columns.entity, "游戏名称");
        assert_eq!(config.columns.text, "review");
    }
}
