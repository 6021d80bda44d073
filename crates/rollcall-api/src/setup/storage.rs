//! Artifact storage setup

use anyhow::{Context, Result};
use rollcall_core::Config;
use rollcall_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing artifact storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize artifact storage")?;
    tracing::info!(
        backend = ?storage.backend_type(),
        "Artifact storage initialized"
    );
    Ok(storage)
}
