//! In-memory avatar store.
//!
//! Backs tests that need a store with observable state. Mirrors the S3
//! store's behavior at the trait boundary: copy overwrites the target,
//! delete is idempotent, and copying a missing key reports `NotFound`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use avamove_core::Location;

use crate::traits::{AvatarStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryAvatarStore {
    objects: Mutex<HashMap<(Location, String), Bytes>>,
}

impl MemoryAvatarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<(Location, String), Bytes>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an object.
    pub fn insert(&self, location: Location, key: impl Into<String>, bytes: impl Into<Bytes>) {
        self.objects().insert((location, key.into()), bytes.into());
    }

    /// Fetch an object's bytes, if present.
    pub fn get(&self, location: Location, key: &str) -> Option<Bytes> {
        self.objects().get(&(location, key.to_string())).cloned()
    }

    /// Snapshot of every object across both stores.
    pub fn snapshot(&self) -> HashMap<(Location, String), Bytes> {
        self.objects().clone()
    }
}

#[async_trait]
impl AvatarStore for MemoryAvatarStore {
    async fn exists(&self, location: Location, key: &str) -> StoreResult<bool> {
        Ok(self.objects().contains_key(&(location, key.to_string())))
    }

    async fn copy(
        &self,
        src: Location,
        src_key: &str,
        dst: Location,
        dst_key: &str,
    ) -> StoreResult<()> {
        let mut objects = self.objects();
        let bytes = objects
            .get(&(src, src_key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(src_key.to_string()))?;
        objects.insert((dst, dst_key.to_string()), bytes);
        Ok(())
    }

    async fn delete(&self, location: Location, key: &str) -> StoreResult<()> {
        self.objects().remove(&(location, key.to_string()));
        Ok(())
    }

    async fn list(&self, location: Location, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects()
            .keys()
            .filter(|(loc, key)| *loc == location && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
