//! Attendance record queries.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use rollcall_core::models::AttendanceRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::constants::{DEFAULT_RECORD_LIMIT, MAX_RECORD_LIMIT};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecordListQuery {
    /// Maximum number of records, newest first (default 50, max 500)
    pub limit: Option<i64>,
}

impl RecordListQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_RECORD_LIMIT)
            .clamp(1, MAX_RECORD_LIMIT)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayRecordsResponse {
    pub date: NaiveDate,
    pub count: usize,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleRecordsResponse {
    pub module_name: String,
    pub count: usize,
    pub records: Vec<AttendanceRecord>,
}

/// Records for the current local date
#[utoipa::path(
    get,
    path = "/api/records/today",
    tag = "records",
    responses(
        (status = 200, description = "Today's attendance records", body = TodayRecordsResponse),
        (status = 500, description = "Record store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn today_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TodayRecordsResponse>, HttpAppError> {
    let date = Local::now().date_naive();
    let records = state.records.list_for_date(date).await?;
    tracing::debug!(%date, count = records.len(), "Listed today's records");

    Ok(Json(TodayRecordsResponse {
        date,
        count: records.len(),
        records,
    }))
}

/// Records for one module
#[utoipa::path(
    get,
    path = "/api/records/module/{module_name}",
    tag = "records",
    params(
        ("module_name" = String, Path, description = "Module name as submitted"),
        RecordListQuery
    ),
    responses(
        (status = 200, description = "Records for the module", body = ModuleRecordsResponse),
        (status = 500, description = "Record store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn module_records(
    State(state): State<Arc<AppState>>,
    Path(module_name): Path<String>,
    Query(query): Query<RecordListQuery>,
) -> Result<Json<ModuleRecordsResponse>, HttpAppError> {
    let records = state
        .records
        .list_for_module(&module_name, query.limit())
        .await?;

    Ok(Json(ModuleRecordsResponse {
        count: records.len(),
        module_name,
        records,
    }))
}
