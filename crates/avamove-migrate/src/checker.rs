//! Consistency checking between avatar records and the object stores.
//!
//! Every record should have an object at its path in the store its prefix
//! names. The checker counts records and found objects per store; the two
//! sides are consistent only when both pairs of counters agree. Records
//! matching neither prefix and objects without a record are reported as
//! well, but they never flip the consistency verdict.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use avamove_core::{AvatarRecord, Location, MigrateError, PrefixMap};
use avamove_db::RecordStore;
use avamove_storage::AvatarStore;

/// A record whose object is missing from its store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingObject {
    pub id: i64,
    pub location: Location,
    pub path: String,
}

/// An object with no record pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanObject {
    pub location: Location,
    pub key: String,
}

/// Outcome of one consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub legacy_records: usize,
    pub legacy_objects_found: usize,
    pub production_records: usize,
    pub production_objects_found: usize,
    pub missing: Vec<MissingObject>,
    pub unclassified: Vec<AvatarRecord>,
    pub orphans: Vec<OrphanObject>,
}

impl ConsistencyReport {
    /// Both stores hold exactly the objects their records promise.
    pub fn is_consistent(&self) -> bool {
        self.legacy_records == self.legacy_objects_found
            && self.production_records == self.production_objects_found
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Consistency Report ===")?;
        writeln!(
            f,
            "Legacy: {} records, {} objects found",
            self.legacy_records, self.legacy_objects_found
        )?;
        writeln!(
            f,
            "Production: {} records, {} objects found",
            self.production_records, self.production_objects_found
        )?;
        if !self.missing.is_empty() {
            writeln!(f, "Missing objects:")?;
            for missing in &self.missing {
                writeln!(
                    f,
                    "  record {}: {} ({})",
                    missing.id, missing.path, missing.location
                )?;
            }
        }
        if !self.unclassified.is_empty() {
            writeln!(f, "Records matching neither prefix:")?;
            for record in &self.unclassified {
                writeln!(f, "  record {}: {}", record.id, record.path)?;
            }
        }
        if !self.orphans.is_empty() {
            writeln!(f, "Objects without a record:")?;
            for orphan in &self.orphans {
                writeln!(f, "  {} ({})", orphan.key, orphan.location)?;
            }
        }
        write!(
            f,
            "Consistent: {}",
            if self.is_consistent() { "yes" } else { "no" }
        )
    }
}

/// Cross-checks avatar records against both object stores.
pub struct ConsistencyChecker {
    records: Arc<dyn RecordStore>,
    store: Arc<dyn AvatarStore>,
    prefixes: PrefixMap,
    concurrency: usize,
}

impl ConsistencyChecker {
    pub fn new(
        records: Arc<dyn RecordStore>,
        store: Arc<dyn AvatarStore>,
        prefixes: PrefixMap,
        concurrency: usize,
    ) -> Self {
        Self {
            records,
            store,
            prefixes,
            concurrency,
        }
    }

    /// Run a full check. Any store or database failure aborts the check.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self) -> Result<ConsistencyReport, MigrateError> {
        let records = self.records.fetch_all().await?;

        let mut legacy_records = 0usize;
        let mut production_records = 0usize;
        let mut unclassified = Vec::new();
        let mut checks: Vec<(Location, AvatarRecord)> = Vec::with_capacity(records.len());
        for record in records {
            match self.prefixes.classify(&record.path) {
                Some(location) => {
                    match location {
                        Location::Legacy => legacy_records += 1,
                        Location::Production => production_records += 1,
                    }
                    checks.push((location, record));
                }
                None => unclassified.push(record),
            }
        }

        // Drained one result at a time so the first store failure aborts the
        // check; lookups still buffered are dropped with the stream.
        let mut lookups = stream::iter(checks.iter())
            .map(|(location, record)| {
                let store = self.store.clone();
                let location = *location;
                async move {
                    let found = store.exists(location, &record.path).await?;
                    Ok::<_, MigrateError>((location, record.id, record.path.clone(), found))
                }
            })
            .buffer_unordered(self.concurrency);

        let mut legacy_objects_found = 0usize;
        let mut production_objects_found = 0usize;
        let mut missing = Vec::new();
        while let Some(result) = lookups.next().await {
            let (location, id, path, found) = result?;
            if found {
                match location {
                    Location::Legacy => legacy_objects_found += 1,
                    Location::Production => production_objects_found += 1,
                }
            } else {
                missing.push(MissingObject { id, location, path });
            }
        }
        missing.sort_by_key(|m| m.id);

        let mut orphans = Vec::new();
        for location in [Location::Legacy, Location::Production] {
            let known: HashSet<&str> = checks
                .iter()
                .filter(|(l, _)| *l == location)
                .map(|(_, record)| record.path.as_str())
                .collect();
            let keys = self
                .store
                .list(location, self.prefixes.for_location(location))
                .await?;
            for key in keys {
                if !known.contains(key.as_str()) {
                    orphans.push(OrphanObject { location, key });
                }
            }
        }

        let report = ConsistencyReport {
            legacy_records,
            legacy_objects_found,
            production_records,
            production_objects_found,
            missing,
            unclassified,
            orphans,
        };

        tracing::info!(
            legacy_records = report.legacy_records,
            legacy_objects_found = report.legacy_objects_found,
            production_records = report.production_records,
            production_objects_found = report.production_objects_found,
            orphans = report.orphans.len(),
            consistent = report.is_consistent(),
            "Consistency check complete"
        );

        Ok(report)
    }
}
