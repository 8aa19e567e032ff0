//! Single-record migration.

use std::sync::Arc;

use avamove_core::{AvatarRecord, Location, MigrateError, MigrationOutcome, PrefixMap};
use avamove_db::RecordStore;
use avamove_storage::{AvatarStore, StoreError};

/// Moves one avatar from the legacy store to production.
///
/// The move is ordered copy, delete, update: the legacy object stays put
/// until the copy lands, and the record is only repointed once production
/// holds the bytes. An interruption at any step leaves the object
/// reachable and a later run able to finish the move.
#[derive(Clone)]
pub struct MigrationExecutor {
    records: Arc<dyn RecordStore>,
    store: Arc<dyn AvatarStore>,
    prefixes: PrefixMap,
}

impl MigrationExecutor {
    pub fn new(
        records: Arc<dyn RecordStore>,
        store: Arc<dyn AvatarStore>,
        prefixes: PrefixMap,
    ) -> Self {
        Self {
            records,
            store,
            prefixes,
        }
    }

    /// Migrate a single record.
    ///
    /// Conditions scoped to this record (missing object, vanished record)
    /// come back as `MigrationOutcome::Failed`; backend failures are errors
    /// and end the run.
    #[tracing::instrument(skip(self, record), fields(record_id = record.id, path = %record.path))]
    pub async fn migrate_one(
        &self,
        record: &AvatarRecord,
    ) -> Result<MigrationOutcome, MigrateError> {
        let new_path = match self.prefixes.to_production(&record.path) {
            Some(path) => path,
            None => {
                return if self.prefixes.classify(&record.path) == Some(Location::Production) {
                    Ok(MigrationOutcome::AlreadyConsistent)
                } else {
                    Ok(MigrationOutcome::Failed(format!(
                        "path matches neither prefix: {}",
                        record.path
                    )))
                };
            }
        };

        if self.store.exists(Location::Legacy, &record.path).await? {
            match self
                .store
                .copy(
                    Location::Legacy,
                    &record.path,
                    Location::Production,
                    &new_path,
                )
                .await
            {
                Ok(()) => {}
                Err(StoreError::NotFound(key)) => {
                    return Ok(MigrationOutcome::Failed(format!(
                        "object vanished during copy: {}",
                        key
                    )));
                }
                Err(e) => return Err(e.into()),
            }

            self.store.delete(Location::Legacy, &record.path).await?;

            if !self.records.update_path(record.id, &new_path).await? {
                return Ok(MigrationOutcome::Failed(
                    "record no longer exists".to_string(),
                ));
            }

            tracing::info!(from = %record.path, to = %new_path, "Avatar moved");
            Ok(MigrationOutcome::Moved)
        } else if self.store.exists(Location::Production, &new_path).await? {
            // The object already moved but the record was never repointed
            // (an earlier run stopped between delete and update). Finish
            // the update.
            if !self.records.update_path(record.id, &new_path).await? {
                return Ok(MigrationOutcome::Failed(
                    "record no longer exists".to_string(),
                ));
            }
            tracing::info!(path = %new_path, "Stale record repaired");
            Ok(MigrationOutcome::Moved)
        } else {
            Ok(MigrationOutcome::Failed(format!(
                "object not found at legacy location: {}",
                record.path
            )))
        }
    }
}
