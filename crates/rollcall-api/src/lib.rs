//! Rollcall API Library
//!
//! HTTP surface of the attendance service: conversion and manual-trigger
//! endpoints, task polling, attendance records and artifact downloads.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError, ValidatedJson};
pub use state::AppState;
