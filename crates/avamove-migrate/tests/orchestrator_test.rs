//! Migration run integration tests.
//!
//! Run with: `cargo test -p avamove-migrate --test orchestrator_test`

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use avamove_core::Location;
use avamove_migrate::{AutoConfirm, MigrationOrchestrator, OrchestratorConfig, RunOutcome};
use avamove_storage::{AvatarStore, MemoryAvatarStore, StoreError, StoreResult};

use helpers::{prefixes, MemoryRecordStore, RefuseConfirm};

fn orchestrator(
    records: Arc<MemoryRecordStore>,
    store: Arc<MemoryAvatarStore>,
    config: OrchestratorConfig,
) -> MigrationOrchestrator {
    MigrationOrchestrator::new(records, store, prefixes(), Arc::new(AutoConfirm), config)
}

/// Seed `count` legacy records with matching objects.
fn seed_legacy(records: &MemoryRecordStore, store: &MemoryAvatarStore, count: i64) {
    for id in 1..=count {
        let path = format!("legacy/avatars/{}.png", id);
        records.insert(id, path.clone());
        store.insert(Location::Legacy, path, format!("bytes-{}", id));
    }
}

#[tokio::test]
async fn test_full_run_moves_every_legacy_record() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 5);
    records.insert(10, "production/avatars/10.png");
    store.insert(Location::Production, "production/avatars/10.png", "ten");

    let outcome = orchestrator(records.clone(), store.clone(), OrchestratorConfig::default())
        .run()
        .await
        .unwrap();

    match outcome {
        RunOutcome::Done {
            summary,
            final_report,
            ..
        } => {
            assert_eq!(summary.dispatched, 5);
            assert_eq!(summary.moved, 5);
            assert!(summary.failed.is_empty());
            assert_eq!(summary.unfinished, 0);
            assert!(final_report.is_consistent());
            assert_eq!(final_report.legacy_records, 0);
            assert_eq!(final_report.production_records, 6);
        }
        other => panic!("expected a completed run, got {:?}", other),
    }

    assert!(store.list(Location::Legacy, "").await.unwrap().is_empty());
    assert!(records
        .paths()
        .values()
        .all(|path| path.starts_with("production/")));
}

#[tokio::test]
async fn test_dry_run_reports_without_changing_anything() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 3);

    let before_objects = store.snapshot();
    let before_paths = records.paths();

    let config = OrchestratorConfig {
        dry_run: true,
        ..Default::default()
    };
    let outcome = orchestrator(records.clone(), store.clone(), config)
        .run()
        .await
        .unwrap();

    match outcome {
        RunOutcome::DryRunComplete { report, pending } => {
            assert!(report.is_consistent());
            assert_eq!(pending, 3);
        }
        other => panic!("expected a dry run, got {:?}", other),
    }

    assert_eq!(store.snapshot(), before_objects);
    assert_eq!(records.paths(), before_paths);
}

#[tokio::test]
async fn test_dry_run_on_an_inconsistent_store_still_changes_nothing() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 2);
    records.insert(9, "legacy/avatars/9.png");

    let before_objects = store.snapshot();
    let before_paths = records.paths();

    let config = OrchestratorConfig {
        dry_run: true,
        ..Default::default()
    };
    let outcome = orchestrator(records.clone(), store.clone(), config)
        .run()
        .await
        .unwrap();

    // The consistency gate comes first, so a dry run over a broken store
    // still ends as an abort.
    assert!(matches!(outcome, RunOutcome::Aborted { .. }));
    assert_eq!(store.snapshot(), before_objects);
    assert_eq!(records.paths(), before_paths);
}

#[tokio::test]
async fn test_inconsistent_state_aborts_before_any_change() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 2);
    // A record whose object is gone.
    records.insert(3, "legacy/avatars/3.png");

    let before_objects = store.snapshot();
    let before_paths = records.paths();

    let outcome = orchestrator(records.clone(), store.clone(), OrchestratorConfig::default())
        .run()
        .await
        .unwrap();

    match outcome {
        RunOutcome::Aborted { report } => {
            assert!(!report.is_consistent());
            assert_eq!(report.missing.len(), 1);
            assert_eq!(report.missing[0].id, 3);
        }
        other => panic!("expected an abort, got {:?}", other),
    }

    assert_eq!(store.snapshot(), before_objects);
    assert_eq!(records.paths(), before_paths);
}

#[tokio::test]
async fn test_declined_confirmation_changes_nothing() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 2);

    let before_objects = store.snapshot();
    let before_paths = records.paths();

    let orchestrator = MigrationOrchestrator::new(
        records.clone(),
        store.clone(),
        prefixes(),
        Arc::new(RefuseConfirm),
        OrchestratorConfig::default(),
    );
    let outcome = orchestrator.run().await.unwrap();

    match outcome {
        RunOutcome::Declined { pending, .. } => assert_eq!(pending, 2),
        other => panic!("expected a declined run, got {:?}", other),
    }

    assert_eq!(store.snapshot(), before_objects);
    assert_eq!(records.paths(), before_paths);
}

#[tokio::test]
async fn test_batch_size_bounds_a_single_run() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 3);

    let config = OrchestratorConfig {
        batch_size: Some(2),
        ..Default::default()
    };
    let outcome = orchestrator(records.clone(), store.clone(), config)
        .run()
        .await
        .unwrap();

    match outcome {
        RunOutcome::Done {
            summary,
            final_report,
            ..
        } => {
            assert_eq!(summary.dispatched, 2);
            assert_eq!(summary.moved, 2);
            // A partial batch still leaves both sides agreeing.
            assert!(final_report.is_consistent());
            assert_eq!(final_report.legacy_records, 1);
            assert_eq!(final_report.production_records, 2);
        }
        other => panic!("expected a completed run, got {:?}", other),
    }

    let paths = records.paths();
    let leftover: Vec<&String> = paths
        .values()
        .filter(|path| path.starts_with("legacy/"))
        .collect();
    assert_eq!(leftover.len(), 1);
}

/// Store whose copies out of one key report the source as gone, as if the
/// object vanished between the existence check and the copy.
struct VanishingStore {
    inner: MemoryAvatarStore,
    poisoned: String,
}

#[async_trait]
impl AvatarStore for VanishingStore {
    async fn exists(&self, location: Location, key: &str) -> StoreResult<bool> {
        self.inner.exists(location, key).await
    }

    async fn copy(
        &self,
        src: Location,
        src_key: &str,
        dst: Location,
        dst_key: &str,
    ) -> StoreResult<()> {
        if src_key == self.poisoned {
            return Err(StoreError::NotFound(src_key.to_string()));
        }
        self.inner.copy(src, src_key, dst, dst_key).await
    }

    async fn delete(&self, location: Location, key: &str) -> StoreResult<()> {
        self.inner.delete(location, key).await
    }

    async fn list(&self, location: Location, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.list(location, prefix).await
    }
}

#[tokio::test]
async fn test_one_vanishing_object_does_not_stop_the_batch() {
    let records = Arc::new(MemoryRecordStore::new());
    let inner = MemoryAvatarStore::new();
    seed_legacy(&records, &inner, 3);

    let store = Arc::new(VanishingStore {
        inner,
        poisoned: "legacy/avatars/2.png".to_string(),
    });

    let orchestrator = MigrationOrchestrator::new(
        records.clone(),
        store,
        prefixes(),
        Arc::new(AutoConfirm),
        OrchestratorConfig::default(),
    );
    let outcome = orchestrator.run().await.unwrap();

    match outcome {
        RunOutcome::Done { summary, .. } => {
            assert_eq!(summary.dispatched, 3);
            assert_eq!(summary.moved, 2);
            assert_eq!(summary.failed.len(), 1);
            assert_eq!(summary.failed[0].id, 2);
            assert_eq!(summary.dispatched, summary.completed());
        }
        other => panic!("expected a completed run, got {:?}", other),
    }

    assert_eq!(
        records.paths().get(&2).map(String::as_str),
        Some("legacy/avatars/2.png")
    );
}

/// Store whose copies never finish.
struct StallingStore {
    inner: MemoryAvatarStore,
}

#[async_trait]
impl AvatarStore for StallingStore {
    async fn exists(&self, location: Location, key: &str) -> StoreResult<bool> {
        self.inner.exists(location, key).await
    }

    async fn copy(
        &self,
        _src: Location,
        _src_key: &str,
        _dst: Location,
        _dst_key: &str,
    ) -> StoreResult<()> {
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn delete(&self, location: Location, key: &str) -> StoreResult<()> {
        self.inner.delete(location, key).await
    }

    async fn list(&self, location: Location, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.list(location, prefix).await
    }
}

#[tokio::test]
async fn test_wait_timeout_leaves_stalled_migrations_detached() {
    let records = Arc::new(MemoryRecordStore::new());
    let inner = MemoryAvatarStore::new();
    seed_legacy(&records, &inner, 1);

    let config = OrchestratorConfig {
        wait_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let orchestrator = MigrationOrchestrator::new(
        records.clone(),
        Arc::new(StallingStore { inner }),
        prefixes(),
        Arc::new(AutoConfirm),
        config,
    );
    let outcome = orchestrator.run().await.unwrap();

    match outcome {
        RunOutcome::Done {
            summary,
            final_report,
            ..
        } => {
            assert_eq!(summary.dispatched, 1);
            assert_eq!(summary.unfinished, 1);
            assert_eq!(summary.moved, 0);
            // The stalled copy left the object where it was.
            assert!(final_report.is_consistent());
        }
        other => panic!("expected a completed run, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_timeout_bounds_a_backlog_beyond_the_permit_count() {
    let records = Arc::new(MemoryRecordStore::new());
    let inner = MemoryAvatarStore::new();
    seed_legacy(&records, &inner, 2);

    // More records than permits, so one task stalls holding the only permit
    // while the other still waits for its own.
    let config = OrchestratorConfig {
        max_concurrency: 1,
        wait_timeout: Some(Duration::from_millis(50)),
        ..Default::default()
    };
    let orchestrator = MigrationOrchestrator::new(
        records.clone(),
        Arc::new(StallingStore { inner }),
        prefixes(),
        Arc::new(AutoConfirm),
        config,
    );
    let outcome = orchestrator.run().await.unwrap();

    match outcome {
        RunOutcome::Done {
            summary,
            final_report,
            ..
        } => {
            assert_eq!(summary.dispatched, 2);
            assert_eq!(summary.unfinished, 2);
            assert_eq!(summary.moved, 0);
            assert!(final_report.is_consistent());
        }
        other => panic!("expected a completed run, got {:?}", other),
    }
}

#[tokio::test]
async fn test_outcomes_serialize_with_a_tag() {
    let records = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(MemoryAvatarStore::new());
    seed_legacy(&records, &store, 2);

    let config = OrchestratorConfig {
        dry_run: true,
        ..Default::default()
    };
    let outcome = orchestrator(records, store, config).run().await.unwrap();

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["outcome"], "dry_run_complete");
    assert_eq!(value["pending"], 2);
    assert_eq!(value["report"]["legacy_records"], 2);
}
