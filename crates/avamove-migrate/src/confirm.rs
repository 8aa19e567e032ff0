//! Confirmation gate for migration runs.
//!
//! Implementations decide whether a batch of migrations may proceed. The
//! gate sits between the dry-run decision and dispatch, so a `false`
//! answer ends the run with nothing changed.

use async_trait::async_trait;

use avamove_core::MigrateError;

/// Gate that decides whether a migration batch may proceed.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    /// Returns true if `pending` records may be migrated.
    async fn confirm(&self, pending: usize) -> Result<bool, MigrateError>;
}

/// Gate that always proceeds. Used for non-interactive runs.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmGate for AutoConfirm {
    async fn confirm(&self, _pending: usize) -> Result<bool, MigrateError> {
        Ok(true)
    }
}
