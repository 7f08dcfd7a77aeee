//! Runtime configuration.
//!
//! Resolution order is command-line flag, then config file, then default.
//! The file is TOML:
//!
//! ```toml
//! live_store = "/srv/office/office_manager.db"
//! snapshot_dir = "/srv/office/backups"
//! catalog = "/srv/office/catalog.db"
//! retention = "15d"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;
use crate::platform;
use crate::service::DEFAULT_RETENTION_DAYS;

pub const DEFAULT_LIVE_STORE: &str = "office_manager.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid retention {value:?}: {source}")]
    Retention {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("could not determine data directory; pass --snapshot-dir and --catalog")]
    NoDataDir,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub live_store: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub retention: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`. A missing file is only an error when it was asked for
    /// explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => Ok(FileConfig::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Path and flag overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub live_store: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub live_path: PathBuf,
    pub snapshot_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub retention: Duration,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path, true)?,
            None => match platform::config_file() {
                Some(path) => FileConfig::load(&path, false)?,
                None => FileConfig::default(),
            },
        };

        let overrides = Overrides {
            live_store: cli.live.clone(),
            snapshot_dir: cli.snapshot_dir.clone(),
            catalog: cli.catalog.clone(),
        };

        Self::resolve(overrides, file, platform::data_dir())
    }

    pub fn resolve(
        overrides: Overrides,
        file: FileConfig,
        data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let live_path = overrides
            .live_store
            .or(file.live_store)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIVE_STORE));

        let snapshot_dir = match overrides.snapshot_dir.or(file.snapshot_dir) {
            Some(dir) => dir,
            None => data_dir.as_ref().ok_or(ConfigError::NoDataDir)?.join("backups"),
        };

        let catalog_path = match overrides.catalog.or(file.catalog) {
            Some(path) => path,
            None => data_dir.as_ref().ok_or(ConfigError::NoDataDir)?.join("catalog.db"),
        };

        let retention = match file.retention {
            Some(value) => humantime::parse_duration(&value)
                .map_err(|source| ConfigError::Retention { value, source })?,
            None => Duration::from_secs(u64::from(DEFAULT_RETENTION_DAYS) * 86_400),
        };

        Ok(Config {
            live_path,
            snapshot_dir,
            catalog_path,
            retention,
        })
    }

    /// Snapshots created at or before the returned instant are past retention.
    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Config rooted in one directory; used by tests and benches.
    pub fn rooted(root: &Path) -> Self {
        Config {
            live_path: root.join(DEFAULT_LIVE_STORE),
            snapshot_dir: root.join("backups"),
            catalog_path: root.join("catalog.db"),
            retention: Duration::from_secs(u64::from(DEFAULT_RETENTION_DAYS) * 86_400),
        }
    }
}
