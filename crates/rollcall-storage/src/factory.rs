#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{InMemoryStorage, Storage, StorageBackend, StorageResult};
#[cfg(not(feature = "storage-local"))]
use crate::StorageError;
use rollcall_core::Config;
use std::sync::Arc;

/// Create an artifact storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(
                config.local_storage_path(),
                config.local_storage_base_url().to_string(),
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            tracing::warn!("Using in-memory artifact storage; artifacts are lost on restart");
            Ok(Arc::new(InMemoryStorage::new(
                config.local_storage_base_url(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::AttendanceConfig;

    #[tokio::test]
    async fn test_create_memory_storage() {
        let config = Config::new(AttendanceConfig {
            storage_backend: StorageBackend::Memory,
            ..AttendanceConfig::default()
        });
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
    }

    #[cfg(feature = "storage-local")]
    #[tokio::test]
    async fn test_create_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(AttendanceConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: dir.path().to_string_lossy().to_string(),
            ..AttendanceConfig::default()
        });
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        assert!(storage.health_check().await.is_ok());
    }
}
