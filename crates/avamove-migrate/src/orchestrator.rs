//! Migration run orchestration.
//!
//! A run is check, fetch, confirm, dispatch, join, re-check. The initial
//! check gates the whole run: any disagreement between records and stores
//! aborts before a single object moves. Each pending record then gets its
//! own migration task, bounded by a concurrency limit, and the run ends
//! with a fresh consistency check over the result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use avamove_core::{
    AvatarRecord, MigrateError, MigrationOutcome, PrefixMap, DEFAULT_MAX_CONCURRENCY,
};
use avamove_db::RecordStore;
use avamove_storage::AvatarStore;

use crate::checker::{ConsistencyChecker, ConsistencyReport};
use crate::confirm::ConfirmGate;
use crate::executor::MigrationExecutor;

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Upper bound on records migrated this run. `None` migrates everything.
    pub batch_size: Option<i64>,
    pub max_concurrency: usize,
    /// Bound on the wait for dispatched migrations. `None` waits for all of them.
    pub wait_timeout: Option<Duration>,
    pub dry_run: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            wait_timeout: None,
            dry_run: false,
        }
    }
}

/// A record migration that ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMigration {
    pub id: i64,
    pub reason: String,
}

/// Accounting for one migration phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub dispatched: usize,
    pub moved: usize,
    pub already_consistent: usize,
    pub failed: Vec<FailedMigration>,
    /// Migrations still running when the wait timed out. They keep running
    /// detached; the final consistency check reflects whatever they finish.
    pub unfinished: usize,
}

impl MigrationSummary {
    fn record(&mut self, id: i64, outcome: MigrationOutcome) {
        match outcome {
            MigrationOutcome::Moved => self.moved += 1,
            MigrationOutcome::AlreadyConsistent => self.already_consistent += 1,
            MigrationOutcome::Failed(reason) => self.failed.push(FailedMigration { id, reason }),
        }
    }

    /// Migrations that reported a terminal outcome.
    pub fn completed(&self) -> usize {
        self.moved + self.already_consistent + self.failed.len()
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Migration Summary ===")?;
        writeln!(f, "Dispatched: {}", self.dispatched)?;
        writeln!(f, "Moved: {}", self.moved)?;
        writeln!(f, "Already consistent: {}", self.already_consistent)?;
        write!(f, "Failed: {}", self.failed.len())?;
        for failure in &self.failed {
            write!(f, "\n  record {}: {}", failure.id, failure.reason)?;
        }
        if self.unfinished > 0 {
            write!(f, "\nStill running at timeout: {}", self.unfinished)?;
        }
        Ok(())
    }
}

/// How a migration run ended. Every variant is a normal exit.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The stores disagreed with the records; nothing was changed.
    Aborted { report: ConsistencyReport },
    /// Dry run: reported what would move, changed nothing.
    DryRunComplete {
        report: ConsistencyReport,
        pending: usize,
    },
    /// The confirmation gate said no; nothing was changed.
    Declined {
        report: ConsistencyReport,
        pending: usize,
    },
    /// The migration phase ran to its end.
    Done {
        report: ConsistencyReport,
        summary: MigrationSummary,
        final_report: ConsistencyReport,
    },
}

/// Drives a whole migration run.
pub struct MigrationOrchestrator {
    records: Arc<dyn RecordStore>,
    prefixes: PrefixMap,
    confirm: Arc<dyn ConfirmGate>,
    config: OrchestratorConfig,
    checker: ConsistencyChecker,
    executor: MigrationExecutor,
}

impl MigrationOrchestrator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        store: Arc<dyn AvatarStore>,
        prefixes: PrefixMap,
        confirm: Arc<dyn ConfirmGate>,
        config: OrchestratorConfig,
    ) -> Self {
        let checker = ConsistencyChecker::new(
            records.clone(),
            store.clone(),
            prefixes.clone(),
            config.max_concurrency,
        );
        let executor = MigrationExecutor::new(records.clone(), store, prefixes.clone());
        Self {
            records,
            prefixes,
            confirm,
            config,
            checker,
            executor,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome, MigrateError> {
        tracing::info!(dry_run = self.config.dry_run, "Avatar migration run started");

        let report = self.checker.check().await?;
        if !report.is_consistent() {
            tracing::warn!("Records and stores disagree, aborting before any change");
            return Ok(RunOutcome::Aborted { report });
        }

        let pending = self
            .records
            .fetch_prefixed(self.prefixes.legacy(), self.config.batch_size)
            .await?;

        if self.config.dry_run {
            tracing::info!(pending = pending.len(), "Dry run complete");
            return Ok(RunOutcome::DryRunComplete {
                report,
                pending: pending.len(),
            });
        }

        if !self.confirm.confirm(pending.len()).await? {
            tracing::info!("Migration declined, nothing changed");
            return Ok(RunOutcome::Declined {
                report,
                pending: pending.len(),
            });
        }

        let summary = self.migrate_batch(pending).await?;

        let final_report = self.checker.check().await?;
        Ok(RunOutcome::Done {
            report,
            summary,
            final_report,
        })
    }

    /// Dispatch one migration task per record, bounded by the concurrency
    /// limit, then join them all.
    async fn migrate_batch(
        &self,
        pending: Vec<AvatarRecord>,
    ) -> Result<MigrationSummary, MigrateError> {
        tracing::info!(
            pending = pending.len(),
            max_concurrency = self.config.max_concurrency,
            "Dispatching avatar migrations"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles: Vec<(i64, JoinHandle<Result<MigrationOutcome, MigrateError>>)> =
            Vec::with_capacity(pending.len());

        // Permits are taken inside the task, not in this loop, so a stalled
        // migration never blocks dispatch and the wait timeout bounds the
        // whole batch.
        for record in pending {
            let semaphore = semaphore.clone();
            let executor = self.executor.clone();
            let id = record.id;
            handles.push((
                id,
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        MigrateError::Internal("migration semaphore closed".to_string())
                    })?;
                    executor.migrate_one(&record).await
                }),
            ));
        }

        let mut summary = MigrationSummary {
            dispatched: handles.len(),
            ..Default::default()
        };

        match self.config.wait_timeout {
            Some(timeout) => {
                // On timeout the unjoined handles are dropped, which
                // detaches the tasks rather than cancelling them. The final
                // check reports whatever state they leave behind.
                match tokio::time::timeout(timeout, Self::join_all(handles, &mut summary)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        summary.unfinished = summary.dispatched - summary.completed();
                        tracing::warn!(
                            unfinished = summary.unfinished,
                            "Timed out waiting for migrations, re-checking with some still running"
                        );
                    }
                }
            }
            None => Self::join_all(handles, &mut summary).await?,
        }

        tracing::info!(
            moved = summary.moved,
            already_consistent = summary.already_consistent,
            failed = summary.failed.len(),
            unfinished = summary.unfinished,
            "Migration phase complete"
        );

        Ok(summary)
    }

    async fn join_all(
        handles: Vec<(i64, JoinHandle<Result<MigrationOutcome, MigrateError>>)>,
        summary: &mut MigrationSummary,
    ) -> Result<(), MigrateError> {
        for (id, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => summary.record(id, outcome),
                // A backend failure ends the run. Handles not yet joined are
                // dropped here and their tasks detach.
                Ok(Err(e)) => return Err(e),
                Err(e) => summary.record(
                    id,
                    MigrationOutcome::Failed(format!("migration task panicked: {}", e)),
                ),
            }
        }
        Ok(())
    }
}
