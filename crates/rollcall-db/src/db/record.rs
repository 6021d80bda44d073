use async_trait::async_trait;
use chrono::NaiveDate;
use rollcall_core::models::AttendanceRecord;
use rollcall_core::AppError;
use sqlx::{PgPool, Postgres};

use super::RecordStore;

const RECORD_COLUMNS: &str = "id, task_id, module_name, mode, original_link, converted_link, \
     attendance_date, status, screenshot_ref, failure_reason, created_at";

/// Repository for attendance records
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[tracing::instrument(skip(self), fields(db.table = "attendance_records", db.operation = "select"))]
    async fn find(
        &self,
        module_name: &str,
        converted_link: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, AttendanceRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_records
            WHERE module_name = $1 AND converted_link = $2 AND attendance_date = $3
            ORDER BY (status = 'succeeded') DESC, created_at DESC
            LIMIT 1
            "#
        ))
        .bind(module_name)
        .bind(converted_link)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "attendance_records", db.operation = "insert", db.record_id = %record.id))]
    async fn save(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records (
                id, task_id, module_name, mode, original_link, converted_link,
                attendance_date, status, screenshot_ref, failure_reason, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.task_id)
        .bind(&record.module_name)
        .bind(record.mode)
        .bind(&record.original_link)
        .bind(&record.converted_link)
        .bind(record.date)
        .bind(record.status)
        .bind(&record.screenshot_ref)
        .bind(&record.failure_reason)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "attendance_records", db.operation = "select"))]
    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE attendance_date = $1 ORDER BY created_at DESC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "attendance_records", db.operation = "select"))]
    async fn list_for_module(
        &self,
        module_name: &str,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE module_name = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(module_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
