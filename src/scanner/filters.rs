use crate::config::ScanConfig;
use regex::Regex;
use std::path::Path;

/// Outcome of running an entry through the configured name/path filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Hidden,
    IncludeMiss,
    ExcludeHit,
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Search semantics: a pattern matches if it matches anywhere in `text`.
fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(text))
}

fn check_dir_patterns(config: &ScanConfig, dir_text: &str) -> Verdict {
    if !config.include_dirs.is_empty() && !any_match(&config.include_dirs, dir_text) {
        return Verdict::IncludeMiss;
    }
    if any_match(&config.exclude_dirs, dir_text) {
        return Verdict::ExcludeHit;
    }
    Verdict::Keep
}

/// Decide whether a directory should be entered. The directory regexes are run
/// against the directory's own path.
pub fn check_dir(config: &ScanConfig, dir: &Path) -> Verdict {
    if config.skip_hidden_dirs && is_hidden(dir) {
        return Verdict::Hidden;
    }
    check_dir_patterns(config, &dir.to_string_lossy())
}

/// Decide whether a file should be recorded. The directory regexes are run against
/// the containing directory, the file regexes against the base name.
pub fn check_file(config: &ScanConfig, file: &Path) -> Verdict {
    if config.skip_hidden_files && is_hidden(file) {
        return Verdict::Hidden;
    }

    let containing = file
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let verdict = check_dir_patterns(config, &containing);
    if verdict != Verdict::Keep {
        return verdict;
    }

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !config.include_files.is_empty() && !any_match(&config.include_files, &name) {
        return Verdict::IncludeMiss;
    }
    if any_match(&config.exclude_files, &name) {
        return Verdict::ExcludeHit;
    }
    Verdict::Keep
}
