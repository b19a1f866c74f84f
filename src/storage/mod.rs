//! Storage backend abstraction
//!
//! Defines the StorageBackend trait and implementations:
//! - FileSystemStorageBackend: native file system with whole-file atomic replace
//! - MemoryStorageBackend: in-process map, used by tests and dry runs
//!
//! Paths are `/`-separated and relative to the backend's root.

use async_trait::async_trait;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Trait for storage backends
///
/// `write_file` replaces the whole file; readers never observe a partially
/// written document.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a file from storage
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Replace a file's contents
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError>;

    /// List file names (not paths) in a directory
    async fn list_files(&self, dir: &str) -> Result<Vec<String>, StorageError>;

    /// Check if a file exists
    async fn file_exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete a file
    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;
}

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStorageBackend;
pub use memory::MemoryStorageBackend;
