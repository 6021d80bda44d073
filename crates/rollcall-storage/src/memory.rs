//! In-memory artifact storage, for tests and ephemeral deployments.

use crate::keys::{artifact_key, ArtifactKind};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    base_url: String,
}

impl InMemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.into(),
        }
    }

    /// Number of stored artifacts
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Stored keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new("memory://artifacts")
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn store(
        &self,
        kind: ArtifactKind,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let key = artifact_key(kind, filename)?;
        let mut files = self.files.write().await;
        if files.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        files.insert(key.clone(), data);
        Ok(key)
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), storage_key)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.files
            .read()
            .await
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.files.read().await.contains_key(storage_key))
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip_and_write_once() {
        let storage = InMemoryStorage::new("http://localhost:8000/api/download");

        let key = storage
            .store(ArtifactKind::Qr, "qr_code_1.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(key, "qr/qr_code_1.png");
        assert_eq!(storage.download(&key).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(
            storage.public_url(&key),
            "http://localhost:8000/api/download/qr/qr_code_1.png"
        );

        let again = storage
            .store(ArtifactKind::Qr, "qr_code_1.png", "image/png", vec![9])
            .await;
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_storage_missing_key() {
        let storage = InMemoryStorage::default();
        assert!(!storage.exists("qr/none.png").await.unwrap());
        assert!(matches!(
            storage.download("qr/none.png").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
