pub mod cache;

use crate::compare::Checksum;
use crate::scanner::{FileRecord, ScanResult};
use cache::ChecksumCache;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Attributes a candidate must share with a query file. Size is always required;
/// every `None` field is a wildcard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateQuery<'a> {
    pub size: u64,
    pub name: Option<&'a str>,
    pub file_type: Option<&'a str>,
    pub parent: Option<&'a str>,
    pub rel_path: Option<&'a Path>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl<'a> CandidateQuery<'a> {
    pub fn size(size: u64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    fn accepts(&self, record: &FileRecord) -> bool {
        record.size == self.size
            && self.name.map_or(true, |name| record.name == name)
            && self.file_type.map_or(true, |t| record.file_type == t)
            && self.parent.map_or(true, |parent| record.parent == parent)
            && self.rel_path.map_or(true, |rel| record.rel_path == rel)
            && self.created.map_or(true, |created| record.created == created)
            && self.modified.map_or(true, |modified| record.modified == modified)
    }
}

/// Canonical-side lookup structure: files bucketed by size, narrowed further by
/// whichever attributes the query selects, plus the session's checksum cache.
#[derive(Debug)]
pub struct ComparisonIndex {
    scan: ScanResult,
    by_size: HashMap<u64, Vec<usize>>,
    checksums: ChecksumCache,
}

impl ComparisonIndex {
    pub fn build(scan: ScanResult) -> Self {
        let mut by_size: HashMap<u64, Vec<usize>> = HashMap::new();
        for (idx, record) in scan.records().iter().enumerate() {
            by_size.entry(record.size).or_default().push(idx);
        }

        debug!(
            "Indexed {} canonical files into {} size buckets",
            scan.len(),
            by_size.len()
        );

        Self {
            scan,
            by_size,
            checksums: ChecksumCache::new(),
        }
    }

    /// Canonical paths consistent with `query`, in scan order.
    pub fn get_candidates(&self, query: &CandidateQuery<'_>) -> Vec<&Path> {
        let Some(bucket) = self.by_size.get(&query.size) else {
            return Vec::new();
        };
        let records = self.scan.records();
        bucket
            .iter()
            .map(|&idx| &records[idx])
            .filter(|record| query.accepts(record))
            .map(|record| record.path.as_path())
            .collect()
    }

    pub fn get_checksum(&self, path: &Path) -> Option<Checksum> {
        self.checksums.get(path)
    }

    pub fn store_checksum(&self, path: &Path, checksum: Checksum) {
        self.checksums.store(path, checksum);
    }

    pub fn checksums(&self) -> &ChecksumCache {
        &self.checksums
    }

    /// The canonical scan this index was built from.
    pub fn scan(&self) -> &ScanResult {
        &self.scan
    }

    pub fn distinct_sizes(&self) -> usize {
        self.by_size.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, size: u64) -> FileRecord {
        let path = PathBuf::from(path);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let file_type = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        FileRecord {
            rel_path: PathBuf::from(&parent).join(&name),
            path,
            size,
            name,
            file_type,
            parent,
            created: DateTime::<Utc>::UNIX_EPOCH,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            mode: 0o644,
            uid: 0,
            gid: 0,
            is_dir: false,
            is_symlink: false,
        }
    }

    fn index() -> ComparisonIndex {
        let mut scan = ScanResult::new();
        scan.insert(record("/canon/photos/a.jpg", 1024));
        scan.insert(record("/canon/backup/a.jpg", 1024));
        scan.insert(record("/canon/photos/b.png", 1024));
        scan.insert(record("/canon/photos/c.jpg", 2048));
        ComparisonIndex::build(scan)
    }

    #[test]
    fn test_size_only() {
        let index = index();
        let candidates = index.get_candidates(&CandidateQuery::size(1024));
        assert_eq!(
            candidates,
            vec![
                Path::new("/canon/photos/a.jpg"),
                Path::new("/canon/backup/a.jpg"),
                Path::new("/canon/photos/b.png"),
            ]
        );
        assert_eq!(index.distinct_sizes(), 2);
    }

    #[test]
    fn test_unknown_size_has_no_candidates() {
        let index = index();
        assert!(index.get_candidates(&CandidateQuery::size(7)).is_empty());
    }

    #[test]
    fn test_narrow_by_name_and_parent() {
        let index = index();
        let query = CandidateQuery {
            name: Some("a.jpg"),
            ..CandidateQuery::size(1024)
        };
        assert_eq!(index.get_candidates(&query).len(), 2);

        let query = CandidateQuery {
            name: Some("a.jpg"),
            parent: Some("photos"),
            ..CandidateQuery::size(1024)
        };
        assert_eq!(
            index.get_candidates(&query),
            vec![Path::new("/canon/photos/a.jpg")]
        );
    }

    #[test]
    fn test_narrow_by_type_requires_size() {
        let index = index();
        let query = CandidateQuery {
            file_type: Some("jpg"),
            ..CandidateQuery::size(2048)
        };
        assert_eq!(
            index.get_candidates(&query),
            vec![Path::new("/canon/photos/c.jpg")]
        );

        let query = CandidateQuery {
            file_type: Some("png"),
            ..CandidateQuery::size(2048)
        };
        assert!(index.get_candidates(&query).is_empty());
    }

    #[test]
    fn test_narrow_by_mtime() {
        let index = index();
        let query = CandidateQuery {
            modified: Some(DateTime::<Utc>::from_timestamp(1, 0).unwrap()),
            ..CandidateQuery::size(1024)
        };
        assert!(index.get_candidates(&query).is_empty());
    }

    #[test]
    fn test_checksum_round_trip() {
        let index = index();
        let path = Path::new("/canon/photos/a.jpg");
        assert!(index.get_checksum(path).is_none());
        index.store_checksum(path, blake3::hash(b"x"));
        assert_eq!(index.get_checksum(path), Some(blake3::hash(b"x")));
        assert_eq!(index.checksums().len(), 1);
    }
}
