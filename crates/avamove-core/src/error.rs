//! Error types module
//!
//! Failures that abort a migration run are unified under `MigrateError`.
//! Per-record failures that the run is allowed to survive are not errors;
//! they are reported as `MigrationOutcome::Failed` instead.

use std::io;

use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SqlxError> for MigrateError {
    fn from(err: SqlxError) -> Self {
        MigrateError::Database(err)
    }
}

impl From<io::Error> for MigrateError {
    fn from(err: io::Error) -> Self {
        MigrateError::Internal(format!("IO error: {}", err))
    }
}
