//! Common utilities and abstractions for the Sparklet project.
//!
//! This crate provides the shared error type and the block storage
//! collaborator that datasets are read from and written to.

pub mod error;
pub mod storage;

pub use error::{CommonError, Result};
pub use storage::{BlockStore, ObjectStoreBlockStore, StorageBackend, StorageBuilder, StorageStats};
