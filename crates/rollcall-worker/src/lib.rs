//! Rollcall Worker Library
//!
//! Coordinates submission tasks: link reconstruction on the request path,
//! background dispatch of the attendance submitter, per-link deduplication and
//! the in-memory task registry that pollers read from.

pub mod coordinator;
pub mod registry;

pub use coordinator::{
    CoordinatorConfig, CoordinatorError, SubmitOutcome, SubmitReceipt, TaskCoordinator,
};
pub use registry::{Claim, RegistryError, TaskRegistry};
