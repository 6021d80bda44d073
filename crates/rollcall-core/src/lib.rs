//! Rollcall Core Library
//!
//! Domain models, error types and configuration shared by every rollcall crate:
//! the attendance link codec, conversion requests, submission tasks and the
//! persisted attendance records.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{AttendanceConfig, BaseConfig, Config, ReasoningProvider};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::link::{AttendanceLink, FormatError, LinkCodec, DEFAULT_PORTAL_BASE_URL};
pub use storage_types::StorageBackend;
