//! Backup orchestration.
//!
//! Composes the snapshot directory and the catalog under one exclusion
//! gate:
//! - create, restore, cleanup, sync and forget hold it exclusively
//! - list and verify hold it shared, so they never observe a half-applied
//!   mutation
//!
//! Every multi-step operation is a straight sequence of fallible steps;
//! the first failing step ends the operation with its error.

pub mod cleanup;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{BackupError, Result};
use crate::live::LiveStore;
use crate::naming::{self, SnapshotKind};
use crate::reconcile::{ReconciliationChecker, SyncReport, VerifyReport};
use crate::store::{CatalogIndex, SnapshotRecord, SnapshotStore};

pub use cleanup::{CleanupFailure, CleanupReport, DEFAULT_RETENTION_DAYS};

/// Result of a successful restore.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub restored_from: String,
    pub restored_id: String,
    pub restored_at: DateTime<Utc>,
    /// Always true: the live file was swapped underneath any open handle,
    /// so callers must reopen their connection to it.
    pub requires_reload: bool,
    pub live_generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_snapshot: Option<SnapshotRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgetOutcome {
    pub id: String,
    pub filename: String,
    pub file_removed: bool,
}

pub struct BackupService {
    live: LiveStore,
    store: SnapshotStore,
    catalog: Mutex<CatalogIndex>,
    gate: RwLock<()>,
}

impl BackupService {
    pub fn new(live: LiveStore, store: SnapshotStore, catalog: CatalogIndex) -> Self {
        BackupService {
            live,
            store,
            catalog: Mutex::new(catalog),
            gate: RwLock::new(()),
        }
    }

    /// Open the snapshot directory (creating it if absent) and the catalog
    /// named by `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let store = SnapshotStore::open(&config.snapshot_dir)?;
        let catalog = CatalogIndex::open(&config.catalog_path)?;
        debug!(
            live = %config.live_path.display(),
            snapshots = %config.snapshot_dir.display(),
            catalog = %config.catalog_path.display(),
            "backup service opened"
        );
        Ok(Self::new(LiveStore::new(&config.live_path), store, catalog))
    }

    pub fn live(&self) -> &LiveStore {
        &self.live
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Copy the live store into a new regular snapshot and register it.
    pub fn create(&self) -> Result<SnapshotRecord> {
        let _exclusive = self.gate.write();
        let record = self.snapshot_live(SnapshotKind::Regular)?;
        info!(id = %record.id, file = %record.filename, bytes = record.size_bytes, "snapshot created");
        Ok(record)
    }

    /// Replace the live store with snapshot `id`.
    ///
    /// Nothing touches the live store until the record is found and its file
    /// confirmed present. A failed pre-restore safety copy is reported as a
    /// warning and does not stop the restore.
    pub fn restore(&self, id: &str) -> Result<RestoreOutcome> {
        let _exclusive = self.gate.write();

        let record = self.catalog.lock().find_by_id(id)?;

        if !self.store.exists(&record.filename) {
            warn!(id = %record.id, file = %record.filename, "catalog references missing snapshot file");
            return Err(BackupError::Inconsistent {
                id: record.id,
                filename: record.filename,
            });
        }

        let mut warnings = Vec::new();
        let safety_snapshot = match self.snapshot_live(SnapshotKind::PreRestoreSafety) {
            Ok(safety) => {
                info!(file = %safety.filename, "pre-restore safety snapshot created");
                Some(safety)
            }
            Err(e) => {
                warn!(error = %e, "pre-restore safety snapshot failed, restoring anyway");
                warnings.push(format!("pre-restore safety snapshot failed: {e}"));
                None
            }
        };

        self.store.overwrite_live(self.live.path(), &record.filename)?;
        let live_generation = self.live.mark_replaced();

        info!(id = %record.id, file = %record.filename, live_generation, "live store restored");

        Ok(RestoreOutcome {
            restored_from: record.filename,
            restored_id: record.id,
            restored_at: Utc::now(),
            requires_reload: true,
            live_generation,
            safety_snapshot,
            warnings,
        })
    }

    /// All catalog records, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotRecord>> {
        let _shared = self.gate.read();
        self.catalog.lock().list_descending()
    }

    pub fn get(&self, id: &str) -> Result<SnapshotRecord> {
        let _shared = self.gate.read();
        self.catalog.lock().find_by_id(id)
    }

    /// Remove one record and its file. A file that is already gone is not
    /// an error; this is how a dangling record gets cleared by hand.
    pub fn forget(&self, id: &str) -> Result<ForgetOutcome> {
        let _exclusive = self.gate.write();
        let mut catalog = self.catalog.lock();

        let record = catalog.find_by_id(id)?;
        let file_removed = match self.store.delete(&record.filename) {
            Ok(()) => true,
            Err(BackupError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        catalog.delete_many(std::slice::from_ref(&record.id))?;

        info!(id = %record.id, file = %record.filename, file_removed, "snapshot forgotten");

        Ok(ForgetOutcome {
            id: record.id,
            filename: record.filename,
            file_removed,
        })
    }

    /// Read-only comparison of the snapshot directory against the catalog.
    pub fn verify(&self) -> Result<VerifyReport> {
        let _shared = self.gate.read();
        let catalog = self.catalog.lock();
        ReconciliationChecker::new(&self.store).verify(&catalog)
    }

    /// Register every snapshot file the catalog does not know about.
    pub fn sync(&self) -> Result<SyncReport> {
        let _exclusive = self.gate.write();
        let mut catalog = self.catalog.lock();
        ReconciliationChecker::new(&self.store).sync(&mut catalog)
    }

    /// Copy, stat, register. Caller holds the gate exclusively.
    fn snapshot_live(&self, kind: SnapshotKind) -> Result<SnapshotRecord> {
        let mut created_at = Utc::now().trunc_subsecs(6);
        let mut filename = naming::snapshot_filename(kind, created_at);
        // coarse clocks can repeat a stamp between back-to-back snapshots
        while self.store.exists(&filename) {
            created_at += chrono::Duration::microseconds(1);
            filename = naming::snapshot_filename(kind, created_at);
        }

        let copied = self.store.copy(self.live.path(), &filename)?;

        let size_bytes = match self.store.stat(&filename) {
            Ok(info) => info.size_bytes,
            Err(e) => {
                warn!(file = %filename, error = %e, "stat after copy failed, using copied byte count");
                copied
            }
        };

        let record = SnapshotRecord::new(filename, size_bytes, created_at, kind);

        if let Err(e) = self.catalog.lock().insert(&record) {
            // an unregistered copy would only resurface later as an orphan
            if let Err(cleanup_err) = self.store.delete(&record.filename) {
                warn!(file = %record.filename, error = %cleanup_err, "could not remove unregistered snapshot");
            }
            return Err(e);
        }

        Ok(record)
    }
}
