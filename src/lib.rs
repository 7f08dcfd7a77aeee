//! Point-in-time snapshots of a single live data file.
//!
//! The live store is copied into a flat snapshot directory and each copy is
//! registered in a separate SQLite catalog. [`service::BackupService`] keeps
//! the two consistent across create, restore and retention cleanup, and
//! [`reconcile`] detects and heals divergence between them.

pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod naming;
pub mod platform;
pub mod reconcile;
pub mod report;
pub mod service;
pub mod store;
pub mod util;

pub use error::{BackupError, Result};
pub use live::LiveStore;
pub use naming::SnapshotKind;
pub use service::BackupService;
pub use store::{CatalogIndex, SnapshotRecord, SnapshotStore};
