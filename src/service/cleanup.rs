//! Retention cleanup.
//!
//! Removes every snapshot whose age is at least the retention window:
//! - a file deleted now, or one that was already gone, releases its record
//! - any other deletion failure keeps the record and is reported per file
//!
//! One bad file never aborts the batch.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::BackupService;
use crate::error::{BackupError, Result};

pub const DEFAULT_RETENTION_DAYS: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Catalog records removed, whether their file was deleted now or was
    /// already gone.
    pub deleted_count: usize,
    pub bytes_freed: u64,
    #[serde(rename = "bytesFreedMB")]
    pub bytes_freed_mb: f64,
    pub errors: Vec<CleanupFailure>,
    /// Records whose file had vanished before cleanup got to it.
    pub already_absent: Vec<String>,
    pub message: String,
}

impl BackupService {
    /// Delete snapshots older than `retention_days` days.
    pub fn cleanup(&self, retention_days: u32) -> Result<CleanupReport> {
        // windows past chrono's range clamp to the earliest instant and expire nothing
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(retention_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.cleanup_older_than(cutoff)
    }

    /// Delete snapshots created at or before `cutoff`.
    pub fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<CleanupReport> {
        let _exclusive = self.gate.write();
        let mut catalog = self.catalog.lock();

        let expired = catalog.query_older_than(cutoff)?;

        let mut released = Vec::new();
        let mut errors = Vec::new();
        let mut already_absent = Vec::new();
        let mut bytes_freed: u64 = 0;

        for record in &expired {
            match self.store.delete(&record.filename) {
                Ok(()) => {
                    bytes_freed = bytes_freed.saturating_add(record.size_bytes);
                    released.push(record.id.clone());
                }
                Err(BackupError::NotFound(_)) => {
                    warn!(id = %record.id, file = %record.filename, "expired snapshot file already absent");
                    already_absent.push(record.filename.clone());
                    released.push(record.id.clone());
                }
                Err(e) => {
                    warn!(file = %record.filename, error = %e, "failed to delete expired snapshot");
                    errors.push(CleanupFailure {
                        filename: record.filename.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let deleted_count = catalog.delete_many(&released)?;

        let message = if expired.is_empty() {
            "no snapshots older than the retention window".to_string()
        } else {
            format!(
                "{deleted_count} of {} expired snapshot(s) removed",
                expired.len()
            )
        };

        info!(
            deleted_count,
            bytes_freed,
            failed = errors.len(),
            already_absent = already_absent.len(),
            "retention cleanup finished"
        );

        Ok(CleanupReport {
            deleted_count,
            bytes_freed,
            bytes_freed_mb: bytes_freed as f64 / 1_024_f64 / 1_024_f64,
            errors,
            already_absent,
            message,
        })
    }
}
