//! Route groups.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
}

pub fn attendance_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/convert-expired-qr", API_PREFIX),
            post(handlers::conversion::convert_expired_qr),
        )
        .route(
            &format!("{}/create-evening-qr", API_PREFIX),
            post(handlers::conversion::create_evening_qr),
        )
        .route(
            &format!("{}/mark-attendance", API_PREFIX),
            post(handlers::conversion::mark_attendance),
        )
        .route(
            &format!("{}/generate-qr-only", API_PREFIX),
            post(handlers::conversion::generate_qr_only),
        )
}

pub fn task_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/tasks/{{task_id}}", API_PREFIX),
        get(handlers::tasks::get_task),
    )
}

pub fn record_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/records/today", API_PREFIX),
            get(handlers::records::today_records),
        )
        .route(
            &format!("{}/records/module/{{module_name}}", API_PREFIX),
            get(handlers::records::module_records),
        )
}

pub fn artifact_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/download/{{kind}}/{{filename}}", API_PREFIX),
        get(handlers::artifacts::download_artifact),
    )
}
