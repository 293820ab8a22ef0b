use crate::compare;
use crate::config::{ScanConfig, ScanOptions};
use crate::error::{Error, Result};
use crate::index::{CandidateQuery, ComparisonIndex};
use crate::scanner::{FileRecord, ScanResult, ScanSource, Scanner};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Which attributes, besides size, a canonical file must share with a query file
/// to be considered a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchFlags {
    pub name: bool,
    pub file_type: bool,
    pub parent: bool,
    pub rel_path: bool,
    pub ctime: bool,
    pub mtime: bool,
    /// Treat an attribute match as a duplicate without reading content. Requires `name`.
    pub skip_checksum: bool,
}

impl MatchFlags {
    fn validate(&self) -> Result<()> {
        if self.skip_checksum && !self.name {
            return Err(Error::InvalidOptions(
                "skip_checksum requires name matching".to_string(),
            ));
        }
        Ok(())
    }

    fn query_for<'a>(&self, record: &'a FileRecord) -> CandidateQuery<'a> {
        CandidateQuery {
            size: record.size,
            name: self.name.then_some(record.name.as_str()),
            file_type: self.file_type.then_some(record.file_type.as_str()),
            parent: self.parent.then_some(record.parent.as_str()),
            rel_path: self.rel_path.then_some(record.rel_path.as_path()),
            created: self.ctime.then_some(record.created),
            modified: self.mtime.then_some(record.modified),
        }
    }
}

/// Classification produced by one compare pass.
#[derive(Debug, Default)]
pub struct CompareOutcome {
    /// Query file → canonical files confirmed identical, in candidate order.
    pub actual_matches: HashMap<PathBuf, Vec<PathBuf>>,
    pub unique: HashSet<PathBuf>,
    /// Query files that turned up as their own candidate.
    pub skipped_self: HashSet<PathBuf>,
    /// Query files that vanished before they could be compared.
    pub source_error_files: HashSet<PathBuf>,
    /// Canonical candidates that vanished before they could be compared.
    pub possible_match_error_files: HashSet<PathBuf>,
    /// Files that exist but could not be read during comparison.
    pub read_error_files: HashSet<PathBuf>,
    /// Comparisons that started from an already cached canonical checksum.
    pub pre_computed_checksum_count: u64,
    /// Query files processed so far.
    pub compared_count: u64,
}

impl CompareOutcome {
    pub fn duplicate_count(&self) -> usize {
        self.actual_matches.len()
    }

    pub fn error_count(&self) -> usize {
        self.source_error_files.len()
            + self.possible_match_error_files.len()
            + self.read_error_files.len()
    }

    fn append_match(&mut self, query: &Path, candidate: &Path) {
        self.actual_matches
            .entry(query.to_path_buf())
            .or_default()
            .push(candidate.to_path_buf());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    QueryScan,
    CanonicalScan,
    Compare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Query,
    Canonical,
}

/// One deduplication session: a query-side scan, a canonical-side scan, then any
/// number of compare passes. Each phase is driven by the caller pulling progress
/// checkpoints from the iterator the phase returns.
pub struct Session {
    query_dirs: Vec<PathBuf>,
    query_files: Vec<PathBuf>,
    canonical_dir: PathBuf,
    query_config: Arc<ScanConfig>,
    canonical_config: Arc<ScanConfig>,
    phase: Phase,
    scan_started: bool,
    query_scan: ScanResult,
    canonical: Option<ComparisonIndex>,
    outcome: CompareOutcome,
}

impl Session {
    /// Validate the inputs and prepare a session. Nothing is scanned yet.
    pub fn new<I, P>(
        query_items: I,
        canonical_dir: impl AsRef<Path>,
        options: &ScanOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::with_canonical_options(query_items, canonical_dir, options, options)
    }

    /// Like [`Session::new`] but with separate filter options for the canonical side.
    pub fn with_canonical_options<I, P>(
        query_items: I,
        canonical_dir: impl AsRef<Path>,
        query_options: &ScanOptions,
        canonical_options: &ScanOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let canonical_dir = resolve_dir(canonical_dir.as_ref())?;

        let mut query_dirs = Vec::new();
        let mut query_files = Vec::new();
        for item in query_items {
            let item = item.as_ref();
            let metadata = fs::metadata(item).map_err(|err| Error::InvalidRoot {
                path: item.to_path_buf(),
                reason: err.to_string(),
            })?;
            if metadata.is_dir() {
                query_dirs.push(resolve_dir(item)?);
            } else {
                query_files.push(resolve_file(item)?);
            }
        }

        if query_dirs.is_empty() && query_files.is_empty() {
            return Err(Error::InvalidOptions("no query items given".to_string()));
        }

        Ok(Self {
            query_dirs,
            query_files,
            canonical_dir,
            query_config: Arc::new(query_options.compile()?),
            canonical_config: Arc::new(canonical_options.compile()?),
            phase: Phase::QueryScan,
            scan_started: false,
            query_scan: ScanResult::new(),
            canonical: None,
            outcome: CompareOutcome::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn canonical_dir(&self) -> &Path {
        &self.canonical_dir
    }

    /// Scan the query directories (first) and files. Yields checked-file counts.
    pub fn do_query_scan(&mut self) -> Result<ScanProgress<'_>> {
        self.begin_scan(Phase::QueryScan)?;
        let mut scanner = Scanner::new(Arc::clone(&self.query_config));
        for dir in &self.query_dirs {
            scanner = scanner.with_directory(dir.clone());
        }
        if !self.query_files.is_empty() {
            scanner = scanner.with_files(self.query_files.clone());
        }
        info!("Scanning query items...");
        Ok(ScanProgress {
            session: self,
            scanner: Some(scanner),
            side: Side::Query,
        })
    }

    /// Scan the canonical directory. Only allowed once the query scan has completed.
    pub fn do_canonical_scan(&mut self) -> Result<ScanProgress<'_>> {
        self.begin_scan(Phase::CanonicalScan)?;
        let scanner = Scanner::new(Arc::clone(&self.canonical_config))
            .with_source(ScanSource::Directory(self.canonical_dir.clone()));
        info!("Scanning canonical directory {}...", self.canonical_dir.display());
        Ok(ScanProgress {
            session: self,
            scanner: Some(scanner),
            side: Side::Canonical,
        })
    }

    /// Classify every query file as duplicate or unique. Yields the running count of
    /// query files processed. Each call starts a fresh outcome; the checksum cache
    /// carries over between calls.
    pub fn do_compare(&mut self, flags: MatchFlags) -> Result<CompareProgress<'_>> {
        flags.validate()?;
        if self.phase != Phase::Compare {
            return Err(Error::PhaseOrder(
                "both scans must complete before comparing".to_string(),
            ));
        }
        self.outcome = CompareOutcome::default();
        info!("Comparing {} query files...", self.query_scan.len());
        Ok(CompareProgress {
            session: self,
            flags,
            position: 0,
        })
    }

    pub fn query_scan(&self) -> &ScanResult {
        &self.query_scan
    }

    pub fn canonical_index(&self) -> Option<&ComparisonIndex> {
        self.canonical.as_ref()
    }

    pub fn outcome(&self) -> &CompareOutcome {
        &self.outcome
    }

    pub fn actual_matches(&self) -> &HashMap<PathBuf, Vec<PathBuf>> {
        &self.outcome.actual_matches
    }

    pub fn unique(&self) -> &HashSet<PathBuf> {
        &self.outcome.unique
    }

    fn begin_scan(&mut self, phase: Phase) -> Result<()> {
        if self.phase != phase {
            return Err(Error::PhaseOrder(format!(
                "cannot start {:?} while in {:?}",
                phase, self.phase
            )));
        }
        if self.scan_started {
            return Err(Error::PhaseOrder(format!(
                "{:?} already started; build a new session to rescan",
                phase
            )));
        }
        self.scan_started = true;
        Ok(())
    }

    fn finish_scan(&mut self, side: Side, result: ScanResult) {
        debug!(
            "{:?} scan complete: {} files recorded, {} checked, {} errors",
            side,
            result.len(),
            result.counters.checked_count,
            result.error_count()
        );
        self.scan_started = false;
        match side {
            Side::Query => {
                self.query_scan = result;
                self.phase = Phase::CanonicalScan;
            }
            Side::Canonical => {
                self.canonical = Some(ComparisonIndex::build(result));
                self.phase = Phase::Compare;
            }
        }
    }

    fn compare_one(&mut self, position: usize, flags: &MatchFlags) {
        let Session {
            query_scan,
            canonical,
            outcome,
            ..
        } = self;
        let Some(index) = canonical.as_ref() else {
            return;
        };
        let record = &query_scan.records()[position];
        let query_path = record.path.as_path();

        let candidates = index.get_candidates(&flags.query_for(record));
        outcome.compared_count += 1;

        if candidates.is_empty() {
            trace!("No candidates for {}", query_path.display());
            outcome.unique.insert(query_path.to_path_buf());
            return;
        }

        let mut matched = false;

        for candidate in &candidates {
            let candidate = *candidate;
            if candidate == query_path {
                outcome.skipped_self.insert(query_path.to_path_buf());
                continue;
            }

            if flags.skip_checksum {
                matched = true;
                outcome.append_match(query_path, candidate);
                continue;
            }

            let cached = index.get_checksum(candidate);
            if cached.is_some() {
                outcome.pre_computed_checksum_count += 1;
            }

            match compare::compare(query_path, candidate, cached.as_ref(), true) {
                Ok(Some(checksum)) => {
                    matched = true;
                    index.store_checksum(candidate, checksum);
                    outcome.append_match(query_path, candidate);
                }
                Ok(None) => {}
                Err(err) => classify_compare_error(outcome, query_path, candidate, &err),
            }
        }

        // A file whose only candidate was itself ends up here too.
        if !matched {
            outcome.unique.insert(query_path.to_path_buf());
        }
    }
}

fn classify_compare_error(
    outcome: &mut CompareOutcome,
    query: &Path,
    candidate: &Path,
    err: &Error,
) {
    let query_gone = !query.exists();
    let candidate_gone = !candidate.exists();
    if query_gone {
        outcome.source_error_files.insert(query.to_path_buf());
    }
    if candidate_gone {
        outcome.possible_match_error_files.insert(candidate.to_path_buf());
    }
    if !query_gone && !candidate_gone {
        match err {
            Error::FileRead { path, .. } => {
                outcome.read_error_files.insert(path.clone());
            }
            _ => {
                outcome.read_error_files.insert(candidate.to_path_buf());
            }
        }
    }
    warn!(
        "Could not compare {} with {}: {}",
        query.display(),
        candidate.display(),
        err
    );
}

fn resolve_dir(path: &Path) -> Result<PathBuf> {
    let resolved = fs::canonicalize(path).map_err(|err| Error::InvalidRoot {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !resolved.is_dir() {
        return Err(Error::InvalidRoot {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(resolved)
}

/// Absolute path with the containing directory resolved but the file itself left
/// alone, so a symlinked file is still seen as a link by the scan.
fn resolve_file(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| Error::InvalidRoot {
        path: path.to_path_buf(),
        reason: "no file name".to_string(),
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(resolve_dir(parent)?.join(name))
}

/// Progress of a running scan phase. The phase completes, and the session moves
/// on, when this iterator is exhausted.
pub struct ScanProgress<'a> {
    session: &'a mut Session,
    scanner: Option<Scanner>,
    side: Side,
}

impl ScanProgress<'_> {
    /// The partial result gathered so far.
    pub fn result(&self) -> Option<&ScanResult> {
        self.scanner.as_ref().map(Scanner::result)
    }
}

impl Iterator for ScanProgress<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let scanner = self.scanner.as_mut()?;
        if let Some(checked) = scanner.next() {
            return Some(checked);
        }
        if let Some(scanner) = self.scanner.take() {
            self.session.finish_scan(self.side, scanner.into_result());
        }
        None
    }
}

impl Drop for ScanProgress<'_> {
    fn drop(&mut self) {
        if self.scanner.is_some() {
            warn!("{:?} scan stopped before completion", self.side);
        }
    }
}

/// Progress of a compare pass; yields the number of query files processed.
pub struct CompareProgress<'a> {
    session: &'a mut Session,
    flags: MatchFlags,
    position: usize,
}

impl Iterator for CompareProgress<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.position >= self.session.query_scan.len() {
            return None;
        }
        self.session.compare_one(self.position, &self.flags);
        self.position += 1;
        Some(self.position as u64)
    }
}
