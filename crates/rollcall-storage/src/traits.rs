//! Storage abstraction trait
//!
//! This module defines the Storage trait that all artifact backends must implement.

use crate::keys::ArtifactKind;
use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Artifact already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Artifacts are write-once: storing to a key that already holds data fails with
/// [`StorageError::AlreadyExists`] and leaves the existing artifact untouched.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store an artifact and return its storage key.
    async fn store(
        &self,
        kind: ArtifactKind,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Resolve a storage key to the URL clients fetch it from.
    fn public_url(&self, storage_key: &str) -> String;

    /// Download an artifact by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check if an artifact exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Verify the backend is usable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
