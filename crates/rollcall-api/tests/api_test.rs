//! Health, records, artifacts and documentation integration tests.
//!
//! Run with: `cargo test -p rollcall-api --test api_test`

mod helpers;

use axum::http::StatusCode;
use chrono::Local;
use helpers::{setup_confirming_app, wait_for_terminal, EXPIRED_LINK, LIVE_LINK};
use rollcall_core::models::{AttendanceRecord, ConversionMode, SubmissionTask};
use rollcall_core::LinkCodec;
use rollcall_db::RecordStore;
use serde_json::{json, Value};

fn succeeded_record(module: &str) -> AttendanceRecord {
    let link = LinkCodec::default().parse(LIVE_LINK).unwrap();
    let task = SubmissionTask::pending(
        module,
        ConversionMode::ExpiredConversion,
        EXPIRED_LINK,
        link,
        "qr/qr_code.png",
    );
    AttendanceRecord::for_outcome(&task, Local::now().date_naive(), None, None)
}

#[tokio::test]
async fn test_health_reports_each_dependency() {
    let app = setup_confirming_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["record_store"], "healthy");
    assert_eq!(body["storage"], "healthy");
    assert_eq!(body["reasoning"], "configured");
    assert_eq!(body["reasoning_provider"], "static");
    assert_eq!(body["webdriver"], "configured");
    assert_eq!(body["tracked_tasks"], 0);
}

#[tokio::test]
async fn test_root_and_openapi_are_served() {
    let app = setup_confirming_app().await;

    let root: Value = app.client().get("/").await.json();
    assert_eq!(root["service"], "rollcall");

    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let spec: Value = response.json();
    assert!(spec["paths"]["/api/convert-expired-qr"].is_object());

    let response = app.client().get("/docs").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_confirming_app().await;

    let response = app
        .client()
        .get("/health")
        .add_header("X-Request-ID", "trace-me-123")
        .await;
    assert_eq!(response.header("x-request-id"), "trace-me-123");
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_handling() {
    let app = setup_confirming_app().await;

    let response = app
        .client()
        .post("/api/generate-qr-only")
        .json(&json!({ "qr_link": LIVE_LINK, "module_name": "x".repeat(128 * 1024) }))
        .await;
    assert!(response.status_code().is_client_error());
    assert!(response.maybe_header("x-request-id").is_some());
    assert!(app.storage.is_empty().await);
}

#[tokio::test]
async fn test_generate_qr_only_stores_downloadable_png() {
    let app = setup_confirming_app().await;
    let client = app.client();

    let response = client
        .post("/api/generate-qr-only")
        .json(&json!({ "qr_link": LIVE_LINK, "module_name": "Networks" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["converted_link"], LIVE_LINK);
    let url = body["qr_image_url"].as_str().unwrap();
    assert!(url.ends_with(body["qr_filename"].as_str().unwrap()));

    let download = client.get(url).await;
    assert_eq!(download.status_code(), StatusCode::OK);
    assert_eq!(download.header("content-type"), "image/png");
    assert_eq!(&download.as_bytes()[..8], b"\x89PNG\r\n\x1a\n");

    assert_eq!(app.launcher.launches(), 0);
    assert_eq!(app.reasoning.calls(), 0);
    assert_eq!(app.storage.len().await, 1);
}

#[tokio::test]
async fn test_download_rejects_unknown_artifacts() {
    let app = setup_confirming_app().await;
    let client = app.client();

    let response = client.get("/api/download/qr/missing.png").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");

    let response = client.get("/api/download/video/clip.png").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = client.get("/api/download/qr/a..b.png").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confirmation_screenshot_is_downloadable() {
    let app = setup_confirming_app().await;
    let client = app.client();

    let receipt: Value = client
        .post("/api/convert-expired-qr")
        .json(&json!({ "qr_link": EXPIRED_LINK, "module_name": "Networks" }))
        .await
        .json();
    let task = wait_for_terminal(client, receipt["task_id"].as_str().unwrap()).await;

    let response = client.get(task["screenshot_url"].as_str().unwrap()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.as_bytes().as_ref(),
        rollcall_services::test_helpers::SCRIPTED_SCREENSHOT
    );
}

#[tokio::test]
async fn test_record_queries() {
    let app = setup_confirming_app().await;
    app.records.save(&succeeded_record("Networks")).await.unwrap();
    app.records.save(&succeeded_record("Networks")).await.unwrap();
    app.records.save(&succeeded_record("Databases")).await.unwrap();

    let today: Value = app.client().get("/api/records/today").await.json();
    assert_eq!(today["count"], 3);
    assert_eq!(today["date"], Local::now().date_naive().to_string());

    let response = app.client().get("/api/records/module/Networks").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let module: Value = response.json();
    assert_eq!(module["module_name"], "Networks");
    assert_eq!(module["count"], 2);
    assert_eq!(module["records"][0]["status"], "succeeded");

    let limited: Value = app
        .client()
        .get("/api/records/module/Networks")
        .add_query_param("limit", 1)
        .await
        .json();
    assert_eq!(limited["count"], 1);
}
