//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs in process: in-memory artifact storage and record store, a
//! canned reasoning service and a scripted browser.

#![allow(dead_code)]

use axum_test::TestServer;
use rollcall_api::setup::{routes, services};
use rollcall_core::{AttendanceConfig, Config};
use rollcall_db::InMemoryRecordStore;
use rollcall_services::test_helpers::{ScriptedLauncher, ScriptedPortal, StaticReasoning};
use rollcall_storage::InMemoryStorage;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const EXPIRED_LINK: &str =
    "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751_84783";
pub const LIVE_LINK: &str =
    "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751_90017";
pub const EVENING_LINK: &str =
    "https://students.nsbm.ac.lk/attendence/index.php?id=52202803255_84783";

pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<InMemoryStorage>,
    pub records: Arc<InMemoryRecordStore>,
    pub launcher: Arc<ScriptedLauncher>,
    pub reasoning: Arc<StaticReasoning>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    Config::new(AttendanceConfig {
        gemini_api_key: Some("test-key".to_string()),
        default_username: Some("student42".to_string()),
        default_password: Some("secret".to_string()),
        auth_timeout_secs: 5,
        navigation_timeout_secs: 5,
        confirmation_timeout_secs: 2,
        ..AttendanceConfig::default()
    })
}

pub async fn setup_test_app(reasoning: StaticReasoning, launcher: ScriptedLauncher) -> TestApp {
    let config = test_config();
    let storage = Arc::new(InMemoryStorage::new("/api/download"));
    let records = Arc::new(InMemoryRecordStore::new());
    let reasoning = Arc::new(reasoning);
    let launcher = Arc::new(launcher);

    let state = services::build_state(
        &config,
        reasoning.clone(),
        launcher.clone(),
        storage.clone(),
        records.clone(),
    )
    .expect("build state");
    let router = routes::setup_routes(&config, state).expect("build router");

    TestApp {
        server: TestServer::new(router).expect("start test server"),
        storage,
        records,
        launcher,
        reasoning,
    }
}

/// App whose reasoning service always answers with `LIVE_LINK` and whose portal confirms.
pub async fn setup_confirming_app() -> TestApp {
    setup_test_app(
        StaticReasoning::new([LIVE_LINK]),
        ScriptedLauncher::new(ScriptedPortal::Confirms),
    )
    .await
}

/// Poll a task until it is succeeded or failed.
pub async fn wait_for_terminal(server: &TestServer, task_id: &str) -> Value {
    for _ in 0..400 {
        let body: Value = server.get(&format!("/api/tasks/{}", task_id)).await.json();
        if matches!(body["status"].as_str(), Some("succeeded") | Some("failed")) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("task {} did not finish", task_id);
}
