use crate::compare::Checksum;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tracing::trace;

/// In-memory content checksums for canonical files, keyed by path.
///
/// Entries are never invalidated: the canonical tree is assumed not to change for
/// the lifetime of a session. Writes lock only the shard holding the key, so a
/// value stored while comparing one query file is visible to every later lookup.
#[derive(Debug, Default)]
pub struct ChecksumCache {
    entries: DashMap<PathBuf, Checksum>,
}

impl ChecksumCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Checksum> {
        self.entries.get(path).map(|entry| *entry.value())
    }

    /// Last write wins.
    pub fn store(&self, path: &Path, checksum: Checksum) {
        trace!("Caching checksum for {}", path.display());
        self.entries.insert(path.to_path_buf(), checksum);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
