//! Submission pipeline wiring and application state

use anyhow::{Context, Result};
use rollcall_core::{Config, LinkCodec};
use rollcall_db::RecordStore;
use rollcall_reasoning::{create_reasoning_service, ReasoningService};
use rollcall_services::{
    AttendanceSubmitter, BrowserLauncher, LinkReconstructor, PortalSelectors, SubmitterTimeouts,
    WebDriverConfig, WebDriverLauncher,
};
use rollcall_storage::Storage;
use rollcall_worker::{CoordinatorConfig, TaskCoordinator};
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Build state backed by the configured reasoning provider and a WebDriver browser.
pub fn initialize_services(
    config: &Config,
    storage: Arc<dyn Storage>,
    records: Arc<dyn RecordStore>,
) -> Result<Arc<AppState>> {
    let reasoning = create_reasoning_service(config).context("Failed to create reasoning client")?;

    let launcher = WebDriverLauncher::new(WebDriverConfig {
        webdriver_url: config.webdriver_url().to_string(),
        headless: config.browser_headless(),
        ..WebDriverConfig::default()
    });
    tracing::info!(
        webdriver_url = %config.webdriver_url(),
        headless = config.browser_headless(),
        "Browser launcher configured"
    );

    build_state(config, reasoning, Arc::new(launcher), storage, records)
}

/// Assemble the reconstructor, submitter and coordinator around the given
/// reasoning client and browser launcher. Must run inside a tokio runtime.
pub fn build_state(
    config: &Config,
    reasoning: Arc<dyn ReasoningService>,
    launcher: Arc<dyn BrowserLauncher>,
    storage: Arc<dyn Storage>,
    records: Arc<dyn RecordStore>,
) -> Result<Arc<AppState>> {
    let provider = reasoning.name().to_string();
    let reconstructor = LinkReconstructor::new(
        reasoning,
        LinkCodec::new(config.portal_base_url()),
        Duration::from_secs(config.reasoning_timeout_secs()),
        config.evening_offset(),
    )
    .context("Failed to build link reconstructor")?;

    let submitter = AttendanceSubmitter::new(
        launcher,
        PortalSelectors::default(),
        SubmitterTimeouts::from_config(config),
    );

    let coordinator = TaskCoordinator::new(
        reconstructor,
        submitter,
        storage.clone(),
        records.clone(),
        CoordinatorConfig::from_config(config),
    );

    tracing::info!(
        reasoning_provider = %provider,
        record_store = records.backend_name(),
        max_concurrent_submissions = config.max_concurrent_submissions(),
        "Submission pipeline initialized"
    );

    Ok(Arc::new(AppState::new(
        config.clone(),
        coordinator,
        storage,
        records,
    )))
}
