//! Avamove Migration Library
//!
//! The migration pipeline: consistency checking, per-record moves, and the
//! orchestrator that strings them together behind a confirmation gate.

pub mod checker;
pub mod confirm;
pub mod executor;
pub mod orchestrator;

pub use checker::{ConsistencyChecker, ConsistencyReport, MissingObject, OrphanObject};
pub use confirm::{AutoConfirm, ConfirmGate};
pub use executor::MigrationExecutor;
pub use orchestrator::{
    FailedMigration, MigrationOrchestrator, MigrationSummary, OrchestratorConfig, RunOutcome,
};
