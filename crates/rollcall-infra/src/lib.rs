//! Rollcall Infrastructure Library
//!
//! Shared infrastructure for the rollcall service:
//! - Telemetry initialization
//! - Request ID middleware
//! - HTTP error body

#[cfg(feature = "middleware")]
pub mod middleware;

pub mod error;
pub mod telemetry;

#[cfg(feature = "middleware")]
pub use middleware::{get_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};

pub use error::ErrorResponse;
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
