//! HTTP handlers and the response bodies they share.

pub mod artifacts;
pub mod conversion;
pub mod health;
pub mod records;
pub mod tasks;

use chrono::{DateTime, Utc};
use rollcall_core::models::{ConversionMode, SubmissionError, SubmissionTask, TaskStatus};
use rollcall_storage::Storage;
use rollcall_worker::SubmitReceipt;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Last path segment of a storage key.
pub(crate) fn filename_of(storage_key: &str) -> &str {
    storage_key.rsplit('/').next().unwrap_or(storage_key)
}

/// Returned by the conversion and manual-trigger endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitReceiptResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// `scheduled`, `attached` or `deduplicated`
    pub outcome: String,
    pub converted_link: String,
    pub qr_image_url: String,
    pub qr_filename: String,
    pub module_name: String,
    pub mode: ConversionMode,
}

impl SubmitReceiptResponse {
    pub fn new(receipt: &SubmitReceipt, storage: &dyn Storage) -> Self {
        let task = &receipt.task;
        Self {
            task_id: task.task_id(),
            status: task.status(),
            outcome: receipt.outcome.to_string(),
            converted_link: task.converted_link().raw().to_string(),
            qr_image_url: storage.public_url(task.qr_image_ref()),
            qr_filename: filename_of(task.qr_image_ref()).to_string(),
            module_name: task.module_name().to_string(),
            mode: task.mode(),
        }
    }
}

/// Snapshot of a submission task with artifact URLs resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub module_name: String,
    pub mode: ConversionMode,
    pub status: TaskStatus,
    pub original_link: String,
    pub converted_link: String,
    pub qr_image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SubmissionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    /// Set when the outcome could not be fully persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
    /// The task mirrors attendance recorded earlier today.
    pub deduplicated: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskResponse {
    pub fn new(task: &SubmissionTask, storage: &dyn Storage) -> Self {
        Self {
            task_id: task.task_id(),
            module_name: task.module_name().to_string(),
            mode: task.mode(),
            status: task.status(),
            original_link: task.original_link().to_string(),
            converted_link: task.converted_link().raw().to_string(),
            qr_image_url: storage.public_url(task.qr_image_ref()),
            screenshot_url: task.screenshot_ref().map(|key| storage.public_url(key)),
            error: task.error().cloned(),
            record_id: task.record_id(),
            storage_error: task.storage_error().map(String::from),
            deduplicated: task.is_deduplicated(),
            created_at: task.created_at(),
            started_at: task.started_at(),
            completed_at: task.completed_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_of() {
        assert_eq!(filename_of("qr/qr_code_20260105_093000.png"), "qr_code_20260105_093000.png");
        assert_eq!(filename_of("plain.png"), "plain.png");
    }
}
