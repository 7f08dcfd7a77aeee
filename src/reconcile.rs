//! Reconciliation between the snapshot directory and the catalog.
//!
//! - verify: read-only comparison reporting orphan files (on disk, not in
//!   the catalog) and orphan records (in the catalog, file gone)
//! - sync: registers orphan files, taking the creation time from the name
//!   or, failing that, the file's modification time
//!
//! Orphan records are only ever reported. Clearing one is a manual step.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::naming::{self, SnapshotKind};
use crate::store::{CatalogIndex, SnapshotRecord, SnapshotStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanRecord {
    pub id: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub consistent: bool,
    pub file_count: usize,
    pub record_count: usize,
    pub orphan_files: Vec<String>,
    pub orphan_records: Vec<OrphanRecord>,
    /// Sum of catalog sizes.
    pub total_bytes: u64,
    pub regular_count: usize,
    pub safety_count: usize,
    pub oldest: Option<SnapshotRecord>,
    pub newest: Option<SnapshotRecord>,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub registered: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<SyncFailure>,
}

/// Compare a directory listing against catalog records (newest first).
pub fn compare(files: &[String], records: &[SnapshotRecord]) -> VerifyReport {
    let on_disk: HashSet<&str> = files.iter().map(String::as_str).collect();
    let registered: HashSet<&str> = records.iter().map(|r| r.filename.as_str()).collect();

    let orphan_files: Vec<String> = files
        .iter()
        .filter(|f| !registered.contains(f.as_str()))
        .cloned()
        .collect();

    let orphan_records: Vec<OrphanRecord> = records
        .iter()
        .filter(|r| !on_disk.contains(r.filename.as_str()))
        .map(|r| OrphanRecord {
            id: r.id.clone(),
            filename: r.filename.clone(),
        })
        .collect();

    let total_bytes = records
        .iter()
        .fold(0u64, |total, r| total.saturating_add(r.size_bytes));
    let safety_count = records
        .iter()
        .filter(|r| r.kind == SnapshotKind::PreRestoreSafety)
        .count();

    VerifyReport {
        consistent: orphan_files.is_empty() && orphan_records.is_empty(),
        file_count: files.len(),
        record_count: records.len(),
        orphan_files,
        orphan_records,
        total_bytes,
        regular_count: records.len() - safety_count,
        safety_count,
        oldest: records.last().cloned(),
        newest: records.first().cloned(),
    }
}

pub struct ReconciliationChecker<'a> {
    store: &'a SnapshotStore,
}

impl<'a> ReconciliationChecker<'a> {
    pub fn new(store: &'a SnapshotStore) -> Self {
        ReconciliationChecker { store }
    }

    pub fn verify(&self, catalog: &CatalogIndex) -> Result<VerifyReport> {
        let files = self.store.list()?;
        let records = catalog.list_descending()?;
        let report = compare(&files, &records);

        if !report.is_consistent() {
            warn!(
                orphan_files = report.orphan_files.len(),
                orphan_records = report.orphan_records.len(),
                "snapshot directory and catalog diverge"
            );
        }

        Ok(report)
    }

    /// Register every orphan file. Running it twice in a row registers
    /// nothing the second time.
    pub fn sync(&self, catalog: &mut CatalogIndex) -> Result<SyncReport> {
        let report = self.verify(catalog)?;
        let mut outcome = SyncReport::default();

        for filename in report.orphan_files {
            if catalog.find_by_filename(&filename)?.is_some() {
                continue;
            }

            let info = match self.store.stat(&filename) {
                Ok(info) => info,
                Err(e) => {
                    warn!(file = %filename, error = %e, "cannot stat orphan snapshot");
                    outcome.failed.push(SyncFailure {
                        filename,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let created_at = naming::parse_created_at(&filename).unwrap_or(info.modified);
            let kind = naming::classify(&filename).unwrap_or(SnapshotKind::Regular);
            let record = SnapshotRecord::new(filename.clone(), info.size_bytes, created_at, kind);

            match catalog.insert(&record) {
                Ok(()) => outcome.registered.push(filename),
                Err(e) => {
                    warn!(file = %filename, error = %e, "cannot register orphan snapshot");
                    outcome.failed.push(SyncFailure {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            registered = outcome.registered.len(),
            failed = outcome.failed.len(),
            "catalog sync finished"
        );

        Ok(outcome)
    }
}
