//! Health check handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rollcall_core::ReasoningProvider;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;

const HEALTHY: &str = "healthy";

/// Run an async check with timeout; returns "healthy", "timeout" or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => HEALTHY.to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

fn configured(ok: bool) -> String {
    if ok {
        "configured".to_string()
    } else {
        "not_configured".to_string()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    /// `healthy` or `degraded`
    pub status: String,
    pub record_store: String,
    pub storage: String,
    pub reasoning: String,
    /// Name of the reasoning client in use
    pub reasoning_provider: String,
    pub webdriver: String,
    /// Submission tasks currently held for polling
    pub tracked_tasks: usize,
}

/// Liveness plus per-dependency status
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies healthy", body = HealthCheckResponse),
        (status = 503, description = "At least one dependency degraded", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let (record_store, storage) = tokio::join!(
        run_check(timeout, state.records.health_check(), state.records.backend_name()),
        run_check(timeout, state.storage.health_check(), "storage"),
    );

    let reasoning = configured(match state.config.reasoning_provider() {
        ReasoningProvider::Gemini => state.config.gemini_api_key().is_some(),
        ReasoningProvider::Anthropic => state.config.anthropic_api_key().is_some(),
    });
    let webdriver = configured(!state.config.webdriver_url().trim().is_empty());

    let healthy = record_store == HEALTHY && storage == HEALTHY;
    if !healthy {
        tracing::warn!(%record_store, %storage, "Health check degraded");
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            record_store,
            storage,
            reasoning,
            reasoning_provider: state.coordinator.reconstructor().provider_name().to_string(),
            webdriver,
            tracked_tasks: state.coordinator.tracked_tasks(),
        }),
    )
}

/// Service banner
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "rollcall",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "documentation": "/docs"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_check_outcomes() {
        let timeout = Duration::from_millis(50);
        assert_eq!(
            run_check(timeout, async { Ok::<(), String>(()) }, "db").await,
            "healthy"
        );
        assert_eq!(
            run_check(timeout, async { Err::<(), _>("refused") }, "db").await,
            "db: refused"
        );
        assert_eq!(
            run_check(
                timeout,
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<(), String>(())
                },
                "db"
            )
            .await,
            "timeout"
        );
    }
}
