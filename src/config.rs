//! Configuration file support
//!
//! A single file groups the `[llm]`, `[pipeline]` and `[export]` sections.
//! Every field is optional; missing values take their defaults.
//!
//! ```toml
//! [llm]
//! model = "qwen2.5:7b"
//! timeout_seconds = 600
//!
//! [pipeline]
//! batch_size = 10
//! fallback = "fail"
//!
//! [pipeline.columns]
//! entity = "game"
//! text = "review"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::ExportConfig;
use crate::llm::LlmConfig;
use crate::pipeline::PipelineConfig;

/// Error loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete profiler configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilerConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl ProfilerConfig {
    /// Load from a TOML or JSON file, chosen by extension
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let parsed = match ext {
            "json" => serde_json::from_str(&contents).map_err(|e| e.to_string()),
            _ => toml::from_str(&contents).map_err(|e| e.to_string()),
        };
        let config: Self = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate().map_err(ConfigError::Invalid)?;
        self.pipeline.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AggregationFallback;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_partial_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiler.toml");
        std::fs::write(
            &path,
            "[llm]\nmodel = \"qwen2.5\"\n\n[pipeline]\nbatch_size = 5\nfallback = \"fail\"\n\n[pipeline.columns]\ntext = \"review\"\n",
        )
        .unwrap();

        let config = ProfilerConfig::load(&path).await.unwrap();
        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.llm.timeout_seconds, 300);
        assert_eq!(config.pipeline.batch_size, 5);
        assert_eq!(config.pipeline.fallback, AggregationFallback::Fail);
        assert_eq!(config.pipeline.columns.text, "review");
        assert_eq!(config.pipeline.columns.entity, crate::source::DEFAULT_ENTITY_COLUMN);
        assert_eq!(config.export, ExportConfig::default());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiler.json");
        std::fs::write(&path, r#"{"export": {"out_dir": "out"}}"#).unwrap();

        let config = ProfilerConfig::load(&path).await.unwrap();
        assert_eq!(config.export.out_dir, PathBuf::from("out"));
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = ProfilerConfig::load(&dir.path().join("nope.toml")).await;
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[pipeline\nbatch_size = ").unwrap();
        assert!(matches!(
            ProfilerConfig::load(&path).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = ProfilerConfig::default();
        config.llm.timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
