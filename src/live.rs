use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle on the single primary data file the rest of the application uses.
///
/// The generation counter moves forward each time a restore replaces the
/// file. Anything holding an open connection records the generation it
/// opened at and reopens once `generation()` has moved past it.
#[derive(Debug)]
pub struct LiveStore {
    path: PathBuf,
    generation: AtomicU64,
}

impl LiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LiveStore {
            path: path.into(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// True when a connection opened at `opened_at` must be reopened.
    pub fn is_stale(&self, opened_at: u64) -> bool {
        self.generation() != opened_at
    }

    pub(crate) fn mark_replaced(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}
