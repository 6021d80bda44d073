//! In-memory record store, used when no database is configured and in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use rollcall_core::models::AttendanceRecord;
use rollcall_core::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::RecordStore;

#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<AttendanceRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records, in insertion order.
    pub async fn all(&self) -> Vec<AttendanceRecord> {
        self.records.read().await.clone()
    }
}

fn newest_first(mut records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find(
        &self,
        module_name: &str,
        converted_link: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let records = self.records.read().await;
        let found = records
            .iter()
            .filter(|r| {
                r.module_name == module_name && r.converted_link == converted_link && r.date == date
            })
            .max_by_key(|r| (r.is_succeeded(), r.created_at))
            .cloned();
        Ok(found)
    }

    async fn save(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(AppError::BadRequest(format!(
                "Record {} already exists",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = self.records.read().await;
        Ok(newest_first(
            records.iter().filter(|r| r.date == date).cloned().collect(),
        ))
    }

    async fn list_for_module(
        &self,
        module_name: &str,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = self.records.read().await;
        let mut matching = newest_first(
            records
                .iter()
                .filter(|r| r.module_name == module_name)
                .cloned()
                .collect(),
        );
        matching.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(matching)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
