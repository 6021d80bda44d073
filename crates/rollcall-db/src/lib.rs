//! Rollcall DB Library
//!
//! Persistence of attendance records: the `RecordStore` trait, a PostgreSQL
//! repository and an in-memory store.

pub mod db;

pub use db::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
