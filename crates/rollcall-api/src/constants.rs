//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Largest accepted request body. Requests are small JSON documents.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Budget for each dependency probe in `/health`.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_RECORD_LIMIT: i64 = 50;
pub const MAX_RECORD_LIMIT: i64 = 500;
