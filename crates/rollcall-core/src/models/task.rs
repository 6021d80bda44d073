use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::link::AttendanceLink;
use super::record::AttendanceRecord;
use super::request::ConversionMode;

/// Status of a submission task: `Pending -> Running -> {Succeeded, Failed}`.
/// A pending task may also fail directly when its job never starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Running => 1,
            TaskStatus::Succeeded | TaskStatus::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Succeeded)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "succeeded" => Ok(TaskStatus::Succeeded),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// Why a submission ended in `Failed`. Preserved verbatim for pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionError {
    #[serde(rename = "auth_error")]
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[serde(rename = "navigation_error")]
    #[error("navigation failed: {message}")]
    Navigation { message: String },

    #[error("no confirmation within {waited_secs}s")]
    ConfirmationTimeout { waited_secs: u64 },

    /// The background job ended without reporting an outcome (panic).
    #[error("submission aborted: {message}")]
    Aborted { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task {task_id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub task_id: Uuid,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Side results attached to a task when it reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub screenshot_ref: Option<String>,
    pub record_id: Option<Uuid>,
    pub storage_error: Option<String>,
}

/// One background submission, as observed by pollers.
///
/// State only changes through [`SubmissionTask::start`], [`SubmissionTask::succeed`]
/// and [`SubmissionTask::fail`]; a terminal task is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTask {
    task_id: Uuid,
    module_name: String,
    mode: ConversionMode,
    original_link: String,
    converted_link: AttendanceLink,
    qr_image_ref: String,
    status: TaskStatus,
    screenshot_ref: Option<String>,
    error: Option<SubmissionError>,
    record_id: Option<Uuid>,
    storage_error: Option<String>,
    deduplicated: bool,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl SubmissionTask {
    pub fn pending(
        module_name: impl Into<String>,
        mode: ConversionMode,
        original_link: impl Into<String>,
        converted_link: AttendanceLink,
        qr_image_ref: impl Into<String>,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            module_name: module_name.into(),
            mode,
            original_link: original_link.into(),
            converted_link,
            qr_image_ref: qr_image_ref.into(),
            status: TaskStatus::Pending,
            screenshot_ref: None,
            error: None,
            record_id: None,
            storage_error: None,
            deduplicated: false,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// A task that is already `Succeeded` because an earlier submission of the
    /// same link was recorded.
    pub fn from_existing_record(
        mode: ConversionMode,
        original_link: impl Into<String>,
        converted_link: AttendanceLink,
        qr_image_ref: impl Into<String>,
        record: &AttendanceRecord,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            module_name: record.module_name.clone(),
            mode,
            original_link: original_link.into(),
            converted_link,
            qr_image_ref: qr_image_ref.into(),
            status: TaskStatus::Succeeded,
            screenshot_ref: record.screenshot_ref.clone(),
            error: None,
            record_id: Some(record.id),
            storage_error: None,
            deduplicated: true,
            created_at: now,
            started_at: None,
            completed_at: Some(now),
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn original_link(&self) -> &str {
        &self.original_link
    }

    pub fn converted_link(&self) -> &AttendanceLink {
        &self.converted_link
    }

    pub fn qr_image_ref(&self) -> &str {
        &self.qr_image_ref
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn screenshot_ref(&self) -> Option<&str> {
        self.screenshot_ref.as_deref()
    }

    pub fn error(&self) -> Option<&SubmissionError> {
        self.error.as_ref()
    }

    pub fn record_id(&self) -> Option<Uuid> {
        self.record_id
    }

    pub fn storage_error(&self) -> Option<&str> {
        self.storage_error.as_deref()
    }

    pub fn is_deduplicated(&self) -> bool {
        self.deduplicated
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn succeed(&mut self, completion: Completion) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Succeeded)?;
        self.apply(completion);
        Ok(())
    }

    /// `completion.screenshot_ref` holds the failure evidence, if any was captured.
    pub fn fail(
        &mut self,
        error: SubmissionError,
        completion: Completion,
    ) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Failed)?;
        self.error = Some(error);
        self.apply(completion);
        Ok(())
    }

    fn advance(&mut self, next: TaskStatus) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(next) {
            return Err(TransitionError {
                task_id: self.task_id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    fn apply(&mut self, completion: Completion) {
        self.screenshot_ref = completion.screenshot_ref;
        self.record_id = completion.record_id;
        self.storage_error = completion.storage_error;
        self.completed_at = Some(Utc::now());
    }
}
