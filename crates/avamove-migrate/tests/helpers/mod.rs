//! Test helpers: in-memory record store and instrumented avatar stores.
//!
//! Run from workspace root: `cargo test -p avamove-migrate`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use avamove_core::{AvatarRecord, Location, MigrateError, PrefixMap};
use avamove_db::RecordStore;
use avamove_migrate::ConfirmGate;
use avamove_storage::{AvatarStore, MemoryAvatarStore, StoreResult};

/// Standard prefix layout used across the tests.
pub fn prefixes() -> PrefixMap {
    PrefixMap::new("legacy/", "production/")
}

/// In-memory stand-in for the Postgres record store.
///
/// Rows live in a BTreeMap so fetches come back ordered by id, matching
/// the real repository's `ORDER BY id`.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: Mutex<BTreeMap<i64, String>>,
    fail_updates: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<i64, String>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, id: i64, path: impl Into<String>) {
        self.rows().insert(id, path.into());
    }

    pub fn remove(&self, id: i64) {
        self.rows().remove(&id);
    }

    /// Snapshot of every row, keyed by id.
    pub fn paths(&self) -> BTreeMap<i64, String> {
        self.rows().clone()
    }

    /// Make every subsequent `update_path` fail with a database error.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub fn restore_updates(&self) {
        self.fail_updates.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_all(&self) -> Result<Vec<AvatarRecord>, MigrateError> {
        Ok(self
            .rows()
            .iter()
            .map(|(id, path)| AvatarRecord::new(*id, path.clone()))
            .collect())
    }

    async fn fetch_prefixed(
        &self,
        prefix: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AvatarRecord>, MigrateError> {
        let mut records: Vec<AvatarRecord> = self
            .rows()
            .iter()
            .filter(|(_, path)| path.starts_with(prefix))
            .map(|(id, path)| AvatarRecord::new(*id, path.clone()))
            .collect();
        if let Some(limit) = limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    async fn update_path(&self, id: i64, new_path: &str) -> Result<bool, MigrateError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(MigrateError::Database(sqlx::Error::PoolClosed));
        }
        match self.rows().get_mut(&id) {
            Some(path) => {
                *path = new_path.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Avatar store wrapper that records the order of mutating calls.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryAvatarStore,
    calls: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryAvatarStore) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn log(&self, entry: String) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }
}

#[async_trait]
impl AvatarStore for RecordingStore {
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
        self.log(format!("copy {}/{} -> {}/{}", src, src_key, dst, dst_key));
        self.inner.copy(src, src_key, dst, dst_key).await
    }

    async fn delete(&self, location: Location, key: &str) -> StoreResult<()> {
        self.log(format!("delete {}/{}", location, key));
        self.inner.delete(location, key).await
    }

    async fn list(&self, location: Location, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.list(location, prefix).await
    }
}

/// Gate that always refuses.
pub struct RefuseConfirm;

#[async_trait]
impl ConfirmGate for RefuseConfirm {
    async fn confirm(&self, _pending: usize) -> Result<bool, MigrateError> {
        Ok(false)
    }
}
