use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{BackupError, Result};
use crate::naming;

/// Size and modification time of a snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Physical snapshot files in a single flat directory.
///
/// Pure file operations; knows nothing about the catalog.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open the snapshot directory, creating it if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| BackupError::io(format!("creating snapshot dir {}", dir.display()), e))?;
        Ok(SnapshotStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of `filename` inside the snapshot directory.
    ///
    /// Rejects anything that is not a bare file name so a catalog row can
    /// never point outside the directory.
    pub fn path_of(&self, filename: &str) -> Result<PathBuf> {
        let bare = Path::new(filename)
            .file_name()
            .is_some_and(|name| name == filename);
        if !bare || filename == "." || filename == ".." {
            return Err(BackupError::io(
                format!("resolving snapshot name {filename:?}"),
                io::Error::new(io::ErrorKind::InvalidInput, "not a bare file name"),
            ));
        }
        Ok(self.dir.join(filename))
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_of(filename).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Copy the current bytes of `source` to `dest_filename`.
    ///
    /// The destination is opened create-new: an existing file with that name
    /// fails the copy instead of being overwritten. A failed copy removes the
    /// partial destination before returning.
    pub fn copy(&self, source: &Path, dest_filename: &str) -> Result<u64> {
        let dest_path = self.path_of(dest_filename)?;

        let mut src = File::open(source)
            .map_err(|e| BackupError::io(format!("opening {}", source.display()), e))?;

        let mut dest = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest_path)
            .map_err(|e| BackupError::io(format!("creating {}", dest_path.display()), e))?;

        let copied = io::copy(&mut src, &mut dest).and_then(|n| {
            dest.flush()?;
            dest.sync_all()?;
            Ok(n)
        });

        match copied {
            Ok(bytes) => {
                debug!(file = dest_filename, bytes, "snapshot copy complete");
                Ok(bytes)
            }
            Err(e) => {
                drop(dest);
                let _ = fs::remove_file(&dest_path);
                Err(BackupError::io(
                    format!("copying {} to {}", source.display(), dest_path.display()),
                    e,
                ))
            }
        }
    }

    pub fn stat(&self, filename: &str) -> Result<FileInfo> {
        let path = self.path_of(filename)?;
        let meta = fs::metadata(&path).map_err(|e| not_found_or_io(filename, "reading metadata of", e))?;
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| BackupError::io(format!("reading mtime of {}", path.display()), e))?;
        Ok(FileInfo {
            size_bytes: meta.len(),
            modified,
        })
    }

    /// All files in the directory that follow the snapshot naming convention.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                BackupError::io(format!("listing {}", self.dir.display()), io::Error::from(e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if naming::classify(name).is_some() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Remove a snapshot file. Fails with `NotFound` if it is already gone.
    pub fn delete(&self, filename: &str) -> Result<()> {
        let path = self.path_of(filename)?;
        fs::remove_file(&path).map_err(|e| not_found_or_io(filename, "deleting", e))?;
        debug!(file = filename, "snapshot file deleted");
        Ok(())
    }

    /// Replace the live store's content with a snapshot's bytes.
    ///
    /// Writes to a temp file next to `live_path`, syncs it, then renames it
    /// over the live store, so the live path always holds either the old or
    /// the new content in full.
    pub fn overwrite_live(&self, live_path: &Path, snapshot_filename: &str) -> Result<u64> {
        let snapshot_path = self.path_of(snapshot_filename)?;

        let parent = live_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let live_name = live_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "live".to_string());
        let tmp_path = parent.join(format!(".{live_name}.restore-{}.tmp", std::process::id()));

        let written = write_temp_copy(&snapshot_path, &tmp_path, live_path).and_then(|n| {
            fs::rename(&tmp_path, live_path)?;
            Ok(n)
        });

        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(BackupError::io(
                    format!("replacing {} from {}", live_path.display(), snapshot_path.display()),
                    e,
                ));
            }
        };

        sync_dir(parent);

        debug!(live = %live_path.display(), snapshot = snapshot_filename, bytes, "live store replaced");
        Ok(bytes)
    }
}

fn write_temp_copy(snapshot_path: &Path, tmp_path: &Path, live_path: &Path) -> io::Result<u64> {
    let mut src = File::open(snapshot_path)?;
    let mut tmp = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp_path)?;

    let bytes = io::copy(&mut src, &mut tmp)?;
    tmp.flush()?;
    tmp.sync_all()?;

    if let Ok(meta) = fs::metadata(live_path) {
        let _ = fs::set_permissions(tmp_path, meta.permissions());
    }

    Ok(bytes)
}

// the rename is only durable once the directory entry is synced
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn not_found_or_io(filename: &str, action: &str, e: io::Error) -> BackupError {
    if e.kind() == io::ErrorKind::NotFound {
        BackupError::NotFound(filename.to_string())
    } else {
        BackupError::io(format!("{action} {filename}"), e)
    }
}
