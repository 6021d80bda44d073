//! Conversion, manual trigger and task polling integration tests.
//!
//! Run with: `cargo test -p rollcall-api --test attendance_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{
    setup_confirming_app, setup_test_app, wait_for_terminal, EVENING_LINK, EXPIRED_LINK,
    LIVE_LINK,
};
use rollcall_services::test_helpers::{ScriptedLauncher, ScriptedPortal, StaticReasoning};
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_convert_expired_qr_returns_receipt_then_succeeds() {
    let app = setup_confirming_app().await;
    let client = app.client();

    let response = client
        .post("/api/convert-expired-qr")
        .json(&json!({ "qr_link": EXPIRED_LINK, "module_name": "Networks" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let receipt: Value = response.json();
    assert_eq!(receipt["outcome"], "scheduled");
    assert_eq!(receipt["converted_link"], LIVE_LINK);
    assert_eq!(receipt["module_name"], "Networks");
    assert_eq!(receipt["mode"], "expired_conversion");
    assert!(receipt["qr_filename"]
        .as_str()
        .unwrap()
        .starts_with("qr_code_"));
    assert!(receipt["qr_image_url"]
        .as_str()
        .unwrap()
        .starts_with("/api/download/qr/"));

    let task = wait_for_terminal(client, receipt["task_id"].as_str().unwrap()).await;
    assert_eq!(task["status"], "succeeded");
    assert_eq!(task["original_link"], EXPIRED_LINK);
    assert_eq!(task["deduplicated"], false);
    assert!(task["screenshot_url"]
        .as_str()
        .unwrap()
        .starts_with("/api/download/screenshot/confirmation_"));
    assert!(task["record_id"].is_string());
    assert!(task.get("error").is_none());

    let records = app.records.all().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].converted_link, LIVE_LINK);
    assert_eq!(app.launcher.active_sessions(), 0);
}

#[tokio::test]
async fn test_create_evening_qr_uses_evening_mode() {
    let app = setup_test_app(
        StaticReasoning::new([EVENING_LINK]),
        ScriptedLauncher::new(ScriptedPortal::Confirms),
    )
    .await;

    let response = app
        .client()
        .post("/api/create-evening-qr")
        .json(&json!({ "morning_qr_link": EXPIRED_LINK, "module_name": "Databases" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let receipt: Value = response.json();
    assert_eq!(receipt["mode"], "evening_derivation");
    assert_eq!(receipt["converted_link"], EVENING_LINK);
    assert!(app.reasoning.prompts()[0].contains("800504"));
}

#[tokio::test]
async fn test_second_request_attaches_to_running_task() {
    let app = setup_test_app(
        StaticReasoning::new([LIVE_LINK]),
        ScriptedLauncher::new(ScriptedPortal::Confirms).with_step_delay(Duration::from_millis(100)),
    )
    .await;
    let client = app.client();
    let body = json!({ "qr_link": EXPIRED_LINK, "module_name": "Networks" });

    let first: Value = client.post("/api/convert-expired-qr").json(&body).await.json();
    let second: Value = client.post("/api/convert-expired-qr").json(&body).await.json();

    assert_eq!(first["outcome"], "scheduled");
    assert_eq!(second["outcome"], "attached");
    assert_eq!(first["task_id"], second["task_id"]);

    wait_for_terminal(client, first["task_id"].as_str().unwrap()).await;
    assert_eq!(app.launcher.launches(), 1);
}

#[tokio::test]
async fn test_request_after_success_is_deduplicated() {
    let app = setup_confirming_app().await;
    let client = app.client();
    let body = json!({ "qr_link": EXPIRED_LINK, "module_name": "Networks" });

    let first: Value = client.post("/api/convert-expired-qr").json(&body).await.json();
    wait_for_terminal(client, first["task_id"].as_str().unwrap()).await;

    let response = client.post("/api/convert-expired-qr").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let second: Value = response.json();
    assert_eq!(second["outcome"], "deduplicated");
    assert_eq!(second["status"], "succeeded");
    assert_ne!(first["task_id"], second["task_id"]);

    let task: Value = client
        .get(&format!("/api/tasks/{}", second["task_id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(task["deduplicated"], true);
    assert_eq!(app.launcher.launches(), 1);
    assert_eq!(app.records.all().await.len(), 1);
}

#[tokio::test]
async fn test_malformed_link_is_rejected_before_reasoning() {
    let app = setup_confirming_app().await;

    let response = app
        .client()
        .post("/api/convert-expired-qr")
        .json(&json!({
            "qr_link": "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751",
            "module_name": "Networks"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_LINK_FORMAT");
    assert_eq!(body["recoverable"], false);
    assert_eq!(app.reasoning.calls(), 0);
}

#[tokio::test]
async fn test_foreign_link_and_blank_module_are_rejected() {
    let app = setup_confirming_app().await;
    let client = app.client();

    let response = client
        .post("/api/convert-expired-qr")
        .json(&json!({ "qr_link": "https://example.com/index.php?id=1_2", "module_name": "Networks" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");

    let response = client
        .post("/api/convert-expired-qr")
        .json(&json!({ "qr_link": EXPIRED_LINK, "module_name": "   " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = client
        .post("/api/convert-expired-qr")
        .json(&json!({ "module_name": "Networks" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");

    assert_eq!(app.reasoning.calls(), 0);
}

#[tokio::test]
async fn test_reconstruction_failure_returns_502_without_task() {
    let app = setup_test_app(
        StaticReasoning::new(["I cannot work out the live link."]),
        ScriptedLauncher::new(ScriptedPortal::Confirms),
    )
    .await;

    let response = app
        .client()
        .post("/api/convert-expired-qr")
        .json(&json!({ "qr_link": EXPIRED_LINK, "module_name": "Networks" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["code"], "RECONSTRUCTION_FAILED");
    assert_eq!(body["recoverable"], true);
    assert_eq!(app.reasoning.calls(), 2);
    assert!(app.storage.is_empty().await);
    assert_eq!(app.launcher.launches(), 0);
}

#[tokio::test]
async fn test_rejected_login_fails_task_with_auth_error() {
    let app = setup_test_app(
        StaticReasoning::new([LIVE_LINK]),
        ScriptedLauncher::new(ScriptedPortal::RejectsLogin),
    )
    .await;
    let client = app.client();

    let receipt: Value = client
        .post("/api/convert-expired-qr")
        .json(&json!({
            "qr_link": EXPIRED_LINK,
            "module_name": "Networks",
            "username": "student42",
            "password": "wrong"
        }))
        .await
        .json();

    let task = wait_for_terminal(client, receipt["task_id"].as_str().unwrap()).await;
    assert_eq!(task["status"], "failed");
    assert_eq!(task["error"]["kind"], "auth_error");

    let records = app.records.all().await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_succeeded());
}

#[tokio::test]
async fn test_mark_attendance_submits_converted_link() {
    let app = setup_confirming_app().await;
    let client = app.client();

    let response = client
        .post("/api/mark-attendance")
        .json(&json!({
            "qr_link": LIVE_LINK,
            "module_name": "Networks",
            "original_qr": EXPIRED_LINK,
            "is_evening": false
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let receipt: Value = response.json();
    assert_eq!(receipt["converted_link"], LIVE_LINK);
    let task = wait_for_terminal(client, receipt["task_id"].as_str().unwrap()).await;
    assert_eq!(task["status"], "succeeded");
    assert_eq!(task["original_link"], EXPIRED_LINK);

    assert_eq!(app.reasoning.calls(), 0);
    assert_eq!(app.launcher.opened_urls().last().map(String::as_str), Some(LIVE_LINK));
}

#[tokio::test]
async fn test_unknown_task_is_404() {
    let app = setup_confirming_app().await;

    let response = app
        .client()
        .get("/api/tasks/00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");

    let response = app.client().get("/api/tasks/not-a-uuid").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
