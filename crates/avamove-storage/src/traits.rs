//! Storage abstraction trait
//!
//! This module defines the AvatarStore trait that both stores are reached
//! through. Every call names the store it targets, so one client spans the
//! legacy and production sides of a migration.

use async_trait::async_trait;
use thiserror::Error;

use avamove_core::{Location, MigrateError};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for MigrateError {
    fn from(err: StoreError) -> Self {
        MigrateError::Storage(err.to_string())
    }
}

/// Avatar object store abstraction
///
/// Implementations hold a handle per store so a single client can check,
/// copy, and delete objects on either side. Keys are full object keys,
/// prefix included.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Check whether an object exists.
    async fn exists(&self, location: Location, key: &str) -> StoreResult<bool>;

    /// Copy an object between stores, overwriting any object at the target key.
    ///
    /// Returns `NotFound` when the source object is gone; other failures are
    /// backend errors.
    async fn copy(
        &self,
        src: Location,
        src_key: &str,
        dst: Location,
        dst_key: &str,
    ) -> StoreResult<()>;

    /// Delete an object. Deleting a key that does not exist is not an error.
    async fn delete(&self, location: Location, key: &str) -> StoreResult<()>;

    /// List the keys under a textual prefix, sorted.
    async fn list(&self, location: Location, prefix: &str) -> StoreResult<Vec<String>>;
}
