//! Application setup and initialization
//!
//! Everything `main` needs to turn a `Config` into a running router: telemetry,
//! record store, artifact storage, the submission pipeline and the routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use rollcall_core::Config;
use rollcall_infra::LogFormat;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let log_format: LogFormat = config
        .log_format()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid LOG_FORMAT: {}", e))?;
    rollcall_infra::init_telemetry(log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let records = database::setup_record_store(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, storage, records)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
