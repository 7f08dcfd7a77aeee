use std::io;

use thiserror::Error;

/// Errors surfaced by the snapshot store, the catalog and the backup service.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Referenced snapshot id or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Catalog record points at a snapshot file that is gone.
    #[error("catalog record {id} references missing snapshot file {filename}")]
    Inconsistent { id: String, filename: String },

    /// Copy, delete, stat or write failure.
    #[error("I/O failure while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),
}

impl BackupError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BackupError::Io {
            context: context.into(),
            source,
        }
    }

    /// Short machine-readable class name used in json error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BackupError::NotFound(_) => "NotFound",
            BackupError::Inconsistent { .. } => "Inconsistent",
            BackupError::Io { .. } => "IOFailure",
            BackupError::Catalog(_) => "CatalogFailure",
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
