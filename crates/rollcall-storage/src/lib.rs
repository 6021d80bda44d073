//! Rollcall Storage Library
//!
//! Artifact storage for generated QR images and portal screenshots. Each
//! artifact is written once and later addressed by its storage key.
//!
//! # Storage key format
//!
//! - QR images: `qr/{filename}`
//! - Screenshots: `screenshot/{filename}`
//!
//! Filenames must not contain `/`, `\` or `..`. Key generation is centralized in
//! the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{artifact_key, content_type_for, ArtifactKind};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::InMemoryStorage;
pub use rollcall_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
