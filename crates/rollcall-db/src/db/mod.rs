//! Record store repositories
//!
//! `RecordStore` is the seam the coordinator and HTTP handlers use. Records are
//! keyed by `(module_name, converted_link, date)`; several rows may share a key
//! (a failed attempt followed by a successful one), and `find` prefers the
//! succeeded row.

pub mod memory;
pub mod record;

use async_trait::async_trait;
use chrono::NaiveDate;
use rollcall_core::models::AttendanceRecord;
use rollcall_core::AppError;

pub use memory::InMemoryRecordStore;
pub use record::PostgresRecordStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Record for a module, converted link and day. A succeeded record wins
    /// over failed ones; otherwise the most recent record is returned.
    async fn find(
        &self,
        module_name: &str,
        converted_link: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    async fn save(&self, record: &AttendanceRecord) -> Result<(), AppError>;

    /// Records for one day, newest first.
    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AppError>;

    /// Records for one module, newest first.
    async fn list_for_module(
        &self,
        module_name: &str,
        limit: i64,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    /// Short backend name for health output
    fn backend_name(&self) -> &'static str;
}
