use anyhow::{Context, Result};
use canon_dupes::Session;
use colored::*;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn print_summary(session: &Session) {
    let outcome = session.outcome();
    let query = session.query_scan();

    info!(
        "{} query files checked, {} duplicates, {} unique",
        format!("{}", query.len()).cyan(),
        format!("{}", outcome.duplicate_count()).red(),
        format!("{}", outcome.unique.len()).green(),
    );
    info!(
        "{} compared with themselves, {} checksums reused",
        format!("{}", outcome.skipped_self.len()).cyan(),
        format!("{}", outcome.pre_computed_checksum_count).cyan(),
    );

    let scan_errors = query.error_count()
        + session
            .canonical_index()
            .map(|index| index.scan().error_count())
            .unwrap_or(0);
    if scan_errors > 0 || outcome.error_count() > 0 {
        info!(
            "{} scan errors, {} comparison errors; results may be incomplete",
            format!("{}", scan_errors).yellow(),
            format!("{}", outcome.error_count()).yellow(),
        );
    }
}

pub fn print_matches(session: &Session) {
    let outcome = session.outcome();

    println!("{}", "MATCHES:".bold());
    for (query, matches) in sorted(outcome.actual_matches.iter()) {
        println!("{}", query.display());
        for canonical in matches {
            println!("    {}", canonical.display().to_string().dimmed());
        }
    }

    println!("{}", "UNIQUE:".bold());
    for path in sorted_paths(&outcome.unique) {
        println!("{}", path.display());
    }
}

/// One row per classified path: `status,query_path,canonical_path`.
pub fn write_csv(session: &Session, path: &Path) -> Result<()> {
    let outcome = session.outcome();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating report {}", path.display()))?;

    writer.write_record(["status", "query_path", "canonical_path"])?;
    for (query, matches) in sorted(outcome.actual_matches.iter()) {
        for canonical in matches {
            writer.write_record([
                "duplicate",
                lossy(query).as_str(),
                lossy(canonical).as_str(),
            ])?;
        }
    }
    for query in sorted_paths(&outcome.unique) {
        writer.write_record(["unique", lossy(query).as_str(), ""])?;
    }
    for query in sorted_paths(&outcome.skipped_self) {
        writer.write_record(["self", lossy(query).as_str(), lossy(query).as_str()])?;
    }
    for query in sorted_paths(&outcome.source_error_files) {
        writer.write_record(["source_error", lossy(query).as_str(), ""])?;
    }
    for canonical in sorted_paths(&outcome.possible_match_error_files) {
        writer.write_record(["candidate_error", "", lossy(canonical).as_str()])?;
    }
    for file in sorted_paths(&outcome.read_error_files) {
        writer.write_record(["read_error", lossy(file).as_str(), ""])?;
    }

    writer
        .flush()
        .with_context(|| format!("writing report {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn sorted<'a, V>(
    entries: impl Iterator<Item = (&'a PathBuf, V)>,
) -> Vec<(&'a PathBuf, V)> {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn sorted_paths<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Vec<&'a PathBuf> {
    let mut paths: Vec<_> = paths.into_iter().collect();
    paths.sort();
    paths
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
