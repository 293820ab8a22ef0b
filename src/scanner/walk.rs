use super::access;
use super::filters::{self, Verdict};
use super::record::FileRecord;
use super::result::{ScanResult, SkipCounts};
use crate::config::ScanConfig;
use crate::platform;
use std::collections::VecDeque;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Something to scan: a directory tree or an explicit list of files.
#[derive(Debug, Clone)]
pub enum ScanSource {
    Directory(PathBuf),
    Files(Vec<PathBuf>),
}

enum Cursor {
    Walk {
        root: PathBuf,
        iter: walkdir::IntoIter,
    },
    Files(std::vec::IntoIter<PathBuf>),
}

enum Pending {
    Entry(walkdir::Result<walkdir::DirEntry>),
    File(PathBuf),
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// A file entry was checked (whatever the outcome).
    Checked,
    /// A directory or walk error was handled.
    Other,
    Done,
}

/// Lazy, single-threaded scan. Iterating yields the checked-file count every
/// `report_frequency` files; the populated [`ScanResult`] is complete once the
/// iterator returns `None`. Stopping early simply leaves a partial result.
pub struct Scanner {
    config: Arc<ScanConfig>,
    pending: VecDeque<ScanSource>,
    current: Option<Cursor>,
    result: ScanResult,
}

impl Scanner {
    pub fn new(config: Arc<ScanConfig>) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            current: None,
            result: ScanResult::new(),
        }
    }

    pub fn with_source(mut self, source: ScanSource) -> Self {
        self.pending.push_back(source);
        self
    }

    pub fn with_directory(self, root: impl Into<PathBuf>) -> Self {
        self.with_source(ScanSource::Directory(root.into()))
    }

    pub fn with_files(self, files: Vec<PathBuf>) -> Self {
        self.with_source(ScanSource::Files(files))
    }

    pub fn result(&self) -> &ScanResult {
        &self.result
    }

    pub fn into_result(self) -> ScanResult {
        self.result
    }

    fn open(&mut self, source: ScanSource) -> Option<Cursor> {
        match source {
            ScanSource::Directory(root) => {
                if !self.root_readable(&root) {
                    return None;
                }
                let max_depth = if self.config.skip_sub_dir { 1 } else { usize::MAX };
                let iter = WalkDir::new(&root)
                    .min_depth(1)
                    .max_depth(max_depth)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter();
                Some(Cursor::Walk { root, iter })
            }
            ScanSource::Files(files) => Some(Cursor::Files(files.into_iter())),
        }
    }

    fn step(&mut self) -> Step {
        loop {
            if self.current.is_none() {
                match self.pending.pop_front() {
                    Some(source) => self.current = self.open(source),
                    None => return Step::Done,
                }
                continue;
            }

            let next = match self.current.as_mut() {
                Some(Cursor::Walk { iter, .. }) => iter.next().map(Pending::Entry),
                Some(Cursor::Files(files)) => files.next().map(Pending::File),
                None => None,
            };

            match next {
                Some(Pending::Entry(Ok(entry))) => return self.visit_entry(entry),
                Some(Pending::Entry(Err(err))) => return self.record_walk_error(err),
                Some(Pending::File(path)) => return self.visit_listed_file(path),
                None => self.current = None,
            }
        }
    }

    fn walk_root(&self) -> Option<&Path> {
        match &self.current {
            Some(Cursor::Walk { root, .. }) => Some(root.as_path()),
            _ => None,
        }
    }

    fn skip_current_dir(&mut self) {
        if let Some(Cursor::Walk { iter, .. }) = self.current.as_mut() {
            iter.skip_current_dir();
        }
    }

    fn visit_entry(&mut self, entry: walkdir::DirEntry) -> Step {
        let path = entry.path().to_path_buf();

        if entry.file_type().is_dir() {
            if self.config.skip_sub_dir {
                return Step::Other;
            }
            if !self.admit_dir(&path) {
                self.skip_current_dir();
            }
            return Step::Other;
        }

        self.result.counters.checked_count += 1;

        // Decided from the directory listing so the target is never touched.
        if entry.path_is_symlink() {
            self.result.counters.files.symlink += 1;
            trace!("Skipping symlink {}", path.display());
            return Step::Checked;
        }

        if !self.passes_filters(&path) {
            return Step::Checked;
        }

        let root = self
            .walk_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| containing_dir(&path));
        if let Some(metadata) = self.stat_file(&path) {
            self.admit_file(&path, &root, &metadata);
        }
        Step::Checked
    }

    fn visit_listed_file(&mut self, path: PathBuf) -> Step {
        self.result.counters.checked_count += 1;

        let Some(metadata) = self.stat_file(&path) else {
            return Step::Checked;
        };

        if metadata.file_type().is_symlink() {
            self.result.counters.files.symlink += 1;
            trace!("Skipping symlink {}", path.display());
            return Step::Checked;
        }

        if !self.passes_filters(&path) {
            return Step::Checked;
        }

        let root = containing_dir(&path);
        self.admit_file(&path, &root, &metadata);
        Step::Checked
    }

    /// Roots are not subject to the directory filters, only to the permission check.
    fn root_readable(&mut self, root: &Path) -> bool {
        match fs::symlink_metadata(root) {
            Ok(metadata) => self.dir_allows_read(root, &metadata),
            Err(err) => {
                self.record_dir_error(root, &err);
                false
            }
        }
    }

    fn dir_allows_read(&mut self, dir: &Path, metadata: &Metadata) -> bool {
        let ownership = platform::ownership(metadata);
        if access::ownership_allows_read(&ownership, self.config.test_uid, self.config.test_gid) {
            return true;
        }
        self.result.counters.dirs.permission += 1;
        self.result.dir_permission_errors.insert(dir.to_path_buf());
        warn!("Access denied reading directory {}", dir.display());
        false
    }

    /// Directory filters, stat and permission check. `false` means the subtree is
    /// not entered.
    fn admit_dir(&mut self, dir: &Path) -> bool {
        let verdict = filters::check_dir(&self.config, dir);
        if verdict != Verdict::Keep {
            count_verdict(&mut self.result.counters.dirs, verdict);
            trace!("Skipping directory {} ({:?})", dir.display(), verdict);
            return false;
        }

        let metadata = match fs::symlink_metadata(dir) {
            Ok(metadata) => metadata,
            Err(err) => {
                self.record_dir_error(dir, &err);
                return false;
            }
        };

        self.dir_allows_read(dir, &metadata)
    }

    fn passes_filters(&mut self, path: &Path) -> bool {
        let verdict = filters::check_file(&self.config, path);
        if verdict == Verdict::Keep {
            return true;
        }
        count_verdict(&mut self.result.counters.files, verdict);
        trace!("Skipping file {} ({:?})", path.display(), verdict);
        false
    }

    fn stat_file(&mut self, path: &Path) -> Option<Metadata> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                self.record_file_error(path, &err);
                None
            }
        }
    }

    fn admit_file(&mut self, path: &Path, root: &Path, metadata: &Metadata) {
        // Replaced by a link between listing and stat.
        if metadata.file_type().is_symlink() {
            self.result.counters.files.symlink += 1;
            return;
        }

        // Opening a FIFO blocks until a writer shows up, so only regular files are kept.
        if !metadata.file_type().is_file() {
            self.result.counters.files.special += 1;
            trace!("Skipping special file {}", path.display());
            return;
        }

        let ownership = platform::ownership(metadata);
        if !access::ownership_allows_read(&ownership, self.config.test_uid, self.config.test_gid)
        {
            self.result.counters.files.permission += 1;
            self.result.file_permission_errors.insert(path.to_path_buf());
            warn!("Access denied reading file {}", path.display());
            return;
        }

        if self.config.skip_zero_len && metadata.len() == 0 {
            self.result.counters.files.zero_length += 1;
            trace!("Skipping zero length file {}", path.display());
            return;
        }

        let record = FileRecord::from_metadata(path, root, metadata);
        if !self.result.insert(record) {
            trace!("Already recorded {}", path.display());
        }
    }

    fn record_file_error(&mut self, path: &Path, err: &io::Error) {
        let counts = &mut self.result.counters.files;
        match err.kind() {
            io::ErrorKind::NotFound => {
                counts.not_found += 1;
                self.result.not_found_errors.insert(path.to_path_buf());
                warn!("File vanished before it could be read: {}", path.display());
            }
            io::ErrorKind::PermissionDenied => {
                counts.permission += 1;
                self.result.file_permission_errors.insert(path.to_path_buf());
                warn!("Access denied reading file {}: {}", path.display(), err);
            }
            _ => {
                counts.other_error += 1;
                self.result.file_generic_errors.insert(path.to_path_buf());
                warn!("Error reading file {}: {}", path.display(), err);
            }
        }
    }

    fn record_dir_error(&mut self, dir: &Path, err: &io::Error) {
        let counts = &mut self.result.counters.dirs;
        match err.kind() {
            io::ErrorKind::NotFound => {
                counts.not_found += 1;
                self.result.not_found_errors.insert(dir.to_path_buf());
                warn!("Directory vanished before it could be read: {}", dir.display());
            }
            io::ErrorKind::PermissionDenied => {
                counts.permission += 1;
                self.result.dir_permission_errors.insert(dir.to_path_buf());
                warn!("Access denied reading directory {}: {}", dir.display(), err);
            }
            _ => {
                counts.other_error += 1;
                self.result.dir_generic_errors.insert(dir.to_path_buf());
                warn!("Error reading directory {}: {}", dir.display(), err);
            }
        }
    }

    /// Listing failures reported by the walker. Only the failing subtree is lost.
    fn record_walk_error(&mut self, err: walkdir::Error) -> Step {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .or_else(|| self.walk_root().map(Path::to_path_buf))
            .unwrap_or_default();
        let io_err = match err.into_io_error() {
            Some(io_err) => io_err,
            None => io::Error::new(io::ErrorKind::Other, "filesystem loop"),
        };
        self.record_listing_error(&path, &io_err)
    }

    /// The failing path is re-stated to tell a subtree from a single file; only a
    /// file counts towards the checkpoint cadence.
    fn record_listing_error(&mut self, path: &Path, io_err: &io::Error) -> Step {
        let is_dir = fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            self.record_dir_error(path, io_err);
            Step::Other
        } else {
            self.result.counters.checked_count += 1;
            self.record_file_error(path, io_err);
            Step::Checked
        }
    }
}

impl Iterator for Scanner {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            match self.step() {
                Step::Done => return None,
                Step::Checked => {
                    let checked = self.result.counters.checked_count;
                    if checked % self.config.report_frequency == 0 {
                        return Some(checked);
                    }
                }
                Step::Other => {}
            }
        }
    }
}

fn count_verdict(counts: &mut SkipCounts, verdict: Verdict) {
    match verdict {
        Verdict::Hidden => counts.hidden += 1,
        Verdict::IncludeMiss => counts.include_miss += 1,
        Verdict::ExcludeHit => counts.exclude_hit += 1,
        Verdict::Keep => {}
    }
}

fn containing_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
