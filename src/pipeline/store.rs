//! Checkpoint persistence
//!
//! One JSON document per session, named after its session key. Documents
//! are always written whole through the [`StorageBackend`].

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::checkpoint::CheckpointDocument;
use super::error::{PipelineError, PipelineResult};
use crate::storage::{StorageBackend, StorageError};

/// File-name prefix of profiling session documents
pub const SESSION_PREFIX: &str = "profiles_";

/// Generate a timestamp-derived session key
pub fn new_session_key() -> String {
    format!("{}{}", SESSION_PREFIX, Utc::now().format("%Y%m%d_%H%M%S_%3f"))
}

/// Reads and writes checkpoint documents
#[derive(Clone)]
pub struct CheckpointStore {
    backend: Arc<dyn StorageBackend>,
}

impl CheckpointStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Storage file name for a session key
    pub fn file_name(key: &str) -> String {
        format!("{key}.json")
    }

    /// Load a session document by key
    pub async fn load(&self, key: &str) -> PipelineResult<Option<CheckpointDocument>> {
        self.load_json(&Self::file_name(key)).await
    }

    /// Persist a session document, replacing the previous version
    pub async fn save(&self, doc: &CheckpointDocument) -> PipelineResult<()> {
        self.save_json(&Self::file_name(doc.session_id()), doc).await
    }

    /// Load any JSON document from the store
    pub async fn load_json<T: DeserializeOwned>(&self, name: &str) -> PipelineResult<Option<T>> {
        match self.backend.read_file(name).await {
            Ok(bytes) => {
                let doc = serde_json::from_slice(&bytes).map_err(|e| {
                    PipelineError::CheckpointError(format!("{name} is not a valid document: {e}"))
                })?;
                Ok(Some(doc))
            }
            Err(StorageError::FileNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write any JSON document to the store
    pub async fn save_json<T: Serialize>(&self, name: &str, doc: &T) -> PipelineResult<()> {
        let json = serde_json::to_vec_pretty(doc)?;
        self.backend.write_file(name, &json).await?;
        debug!(document = name, bytes = json.len(), "Checkpoint saved");
        Ok(())
    }

    /// Keys of all stored sessions, sorted
    pub async fn list_sessions(&self) -> PipelineResult<Vec<String>> {
        let files = match self.backend.list_files("").await {
            Ok(files) => files,
            Err(StorageError::DirectoryNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = files
            .into_iter()
            .filter(|f| f.starts_with(SESSION_PREFIX))
            .filter_map(|f| f.strip_suffix(".json").map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Most recently created session, optionally restricted to one source
    ///
    /// Unreadable documents are skipped with a warning.
    pub async fn latest(&self, source_file: Option<&str>) -> PipelineResult<Option<CheckpointDocument>> {
        let mut best: Option<CheckpointDocument> = None;

        for key in self.list_sessions().await? {
            let doc = match self.load(&key).await {
                Ok(Some(doc)) => doc,
                Ok(None) => continue,
                Err(e) => {
                    warn!(session = %key, error = %e, "Skipping unreadable checkpoint");
                    continue;
                }
            };

            if let Some(source) = source_file
                && doc.session_info.source_file != source
            {
                continue;
            }

            let newer = best
                .as_ref()
                .is_none_or(|b| doc.session_info.created_at > b.session_info.created_at);
            if newer {
                best = Some(doc);
            }
        }

        Ok(best)
    }

    /// Find the session to resume for a source file
    pub async fn find_resumable(&self, source_file: &str) -> PipelineResult<Option<CheckpointDocument>> {
        self.latest(Some(source_file)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageBackend;
    use chrono::Duration;

    fn store() -> (Arc<MemoryStorageBackend>, CheckpointStore) {
        let backend = Arc::new(MemoryStorageBackend::new());
        (backend.clone(), CheckpointStore::new(backend))
    }

    #[test]
    fn test_session_key_format() {
        let key = new_session_key();
        assert!(key.starts_with("profiles_"));
        // profiles_YYYYmmdd_HHMMSS_mmm
        assert_eq!(key.len(), "profiles_".len() + 19);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (_, store) = store();
        let doc = CheckpointDocument::new("profiles_a", "m", 20, "r.csv");
        store.save(&doc).await.unwrap();

        assert_eq!(store.load("profiles_a").await.unwrap(), Some(doc));
        assert_eq!(store.load("profiles_missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_resumable_picks_newest_matching() {
        let (_, store) = store();
        let mut old = CheckpointDocument::new("profiles_1", "m", 20, "r.csv");
        old.session_info.created_at -= Duration::hours(2);
        let new = CheckpointDocument::new("profiles_2", "m", 20, "r.csv");
        let mut other = CheckpointDocument::new("profiles_3", "m", 20, "other.csv");
        other.session_info.created_at += Duration::hours(1);

        for doc in [&old, &new, &other] {
            store.save(doc).await.unwrap();
        }

        let found = store.find_resumable("r.csv").await.unwrap().unwrap();
        assert_eq!(found.session_id(), "profiles_2");
        assert!(store.find_resumable("none.csv").await.unwrap().is_none());
        assert_eq!(
            store.latest(None).await.unwrap().unwrap().session_id(),
            "profiles_3"
        );
    }

    #[tokio::test]
    async fn test_unreadable_document_skipped() {
        let (backend, store) = store();
        backend
            .write_file("profiles_bad.json", b"{not json")
            .await
            .unwrap();
        backend.write_file("notes.json", b"{}").await.unwrap();
        store
            .save(&CheckpointDocument::new("profiles_ok", "m", 20, "r.csv"))
            .await
            .unwrap();

        assert_eq!(
            store.list_sessions().await.unwrap(),
            vec!["profiles_bad", "profiles_ok"]
        );
        let found = store.find_resumable("r.csv").await.unwrap().unwrap();
        assert_eq!(found.session_id(), "profiles_ok");
        assert!(matches!(
            store.load("profiles_bad").await,
            Err(PipelineError::CheckpointError(_))
        ));
    }
}
