use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::request::ConversionMode;
use super::task::{SubmissionError, SubmissionTask};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Succeeded,
    Failed,
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordStatus::Succeeded => write!(f, "succeeded"),
            RecordStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(RecordStatus::Succeeded),
            "failed" => Ok(RecordStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid record status: {}", s)),
        }
    }
}

/// Persisted projection of a terminal submission task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub task_id: Uuid,
    pub module_name: String,
    pub mode: ConversionMode,
    pub original_link: String,
    pub converted_link: String,
    /// Local calendar day the attendance was submitted for.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "attendance_date"))]
    pub date: NaiveDate,
    pub status: RecordStatus,
    pub screenshot_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Record the outcome of `task`. `failure` is `None` for a confirmed
    /// submission; `screenshot_ref` is the confirmation or error evidence.
    pub fn for_outcome(
        task: &SubmissionTask,
        date: NaiveDate,
        screenshot_ref: Option<String>,
        failure: Option<&SubmissionError>,
    ) -> Self {
        let (status, failure_reason) = match failure {
            None => (RecordStatus::Succeeded, None),
            Some(cause) => (RecordStatus::Failed, Some(cause.to_string())),
        };

        Self {
            id: Uuid::new_v4(),
            task_id: task.task_id(),
            module_name: task.module_name().to_string(),
            mode: task.mode(),
            original_link: task.original_link().to_string(),
            converted_link: task.converted_link().raw().to_string(),
            date,
            status,
            screenshot_ref,
            failure_reason,
            created_at: Utc::now(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == RecordStatus::Succeeded
    }
}
