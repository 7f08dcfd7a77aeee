use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use crate::error::{BackupError, Result};
use crate::naming::SnapshotKind;

/// Catalog entry for one snapshot file. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub id: String,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub kind: SnapshotKind,
    pub status: String,
}

pub const STATUS_COMPLETED: &str = "completed";

impl SnapshotRecord {
    pub fn new(
        filename: impl Into<String>,
        size_bytes: u64,
        created_at: DateTime<Utc>,
        kind: SnapshotKind,
    ) -> Self {
        SnapshotRecord {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            size_bytes,
            created_at,
            kind,
            status: STATUS_COMPLETED.to_string(),
        }
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            size_bytes INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed'
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_created_at ON snapshots(created_at)",
        [],
    )?;

    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT id, filename, size_bytes, created_at, kind, status FROM snapshots";

/// Metadata index of snapshot records, stored in its own SQLite file.
///
/// Metadata only: nothing here touches the snapshot directory.
pub struct CatalogIndex {
    conn: Connection,
}

impl CatalogIndex {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| BackupError::io(format!("creating {}", parent.display()), e))?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(CatalogIndex { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(CatalogIndex { conn })
    }

    pub fn insert(&mut self, record: &SnapshotRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO snapshots (id, filename, size_bytes, created_at, kind, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.filename,
                i64::try_from(record.size_bytes).unwrap_or(i64::MAX),
                record.created_at.timestamp_micros(),
                record.kind.as_str(),
                record.status,
            ],
        )?;
        Ok(())
    }

    /// Newest first; records created in the same microsecond come out
    /// newest-inserted first.
    pub fn list_descending(&self) -> Result<Vec<SnapshotRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"))?;

        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    pub fn find_by_id(&self, id: &str) -> Result<SnapshotRecord> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        stmt.query_row(params![id], record_from_row)
            .optional()?
            .ok_or_else(|| BackupError::NotFound(format!("snapshot {id}")))
    }

    pub fn find_by_filename(&self, filename: &str) -> Result<Option<SnapshotRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE filename = ?1"))?;
        Ok(stmt.query_row(params![filename], record_from_row).optional()?)
    }

    /// Records created at or before `cutoff`, oldest first.
    pub fn query_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<SnapshotRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE created_at <= ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;

        let records = stmt
            .query_map(params![cutoff.timestamp_micros()], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Delete the given ids in one transaction. Returns how many rows went.
    pub fn delete_many(&mut self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM snapshots WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;

        Ok(removed)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<SnapshotRecord> {
    let micros: i64 = row.get(3)?;
    let kind_str: String = row.get(4)?;

    let created_at = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Integer,
            format!("created_at out of range: {micros}").into(),
        )
    })?;

    let kind = SnapshotKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown snapshot kind: {kind_str}").into(),
        )
    })?;

    Ok(SnapshotRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        size_bytes: row.get::<_, i64>(2)?.max(0) as u64,
        created_at,
        kind,
        status: row.get(5)?,
    })
}
