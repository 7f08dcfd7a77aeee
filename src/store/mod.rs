//! Storage leaves of the backup subsystem.
//!
//! - files: physical snapshot files in one flat directory
//! - catalog: SQLite metadata index of snapshot records
//!
//! Neither leaf knows about the other; the backup service and the
//! reconciliation checker are the only places they are combined.

pub mod catalog;
pub mod files;

pub use catalog::{CatalogIndex, SnapshotRecord};
pub use files::{FileInfo, SnapshotStore};
