use super::record::FileRecord;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Per-reason skip and error tallies for one kind of entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub permission: u64,
    pub not_found: u64,
    pub symlink: u64,
    /// FIFOs, sockets, device nodes and anything else that is not a regular file.
    pub special: u64,
    pub hidden: u64,
    pub zero_length: u64,
    pub include_miss: u64,
    pub exclude_hit: u64,
    pub other_error: u64,
}

impl SkipCounts {
    pub fn errors(&self) -> u64 {
        self.permission + self.not_found + self.other_error
    }

    pub fn skipped(&self) -> u64 {
        self.symlink
            + self.special
            + self.hidden
            + self.zero_length
            + self.include_miss
            + self.exclude_hit
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounters {
    /// Files that passed every filter and were recorded.
    pub initial_count: u64,
    /// Every file entry the scan looked at.
    pub checked_count: u64,
    pub files: SkipCounts,
    pub dirs: SkipCounts,
}

/// Output of one scan pass: the recorded files in discovery order plus counters
/// and the paths behind every classified error.
#[derive(Debug, Default)]
pub struct ScanResult {
    records: Vec<FileRecord>,
    positions: HashMap<PathBuf, usize>,
    pub counters: ScanCounters,
    pub dir_permission_errors: HashSet<PathBuf>,
    pub dir_generic_errors: HashSet<PathBuf>,
    pub file_permission_errors: HashSet<PathBuf>,
    pub file_generic_errors: HashSet<PathBuf>,
    pub not_found_errors: HashSet<PathBuf>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file. A path already present is left untouched and `false` returned.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        if self.positions.contains_key(&record.path) {
            return false;
        }
        self.positions.insert(record.path.clone(), self.records.len());
        self.records.push(record);
        self.counters.initial_count += 1;
        true
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.positions.get(path).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.positions.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    pub fn error_count(&self) -> u64 {
        self.counters.files.errors() + self.counters.dirs.errors()
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}
