use crate::error::{Error, Result};
use crate::platform;
use crate::session::MatchFlags;
use config::{Config, Environment, File as ConfigFile, Source};
use regex::Regex;
use serde::Deserialize;

/// Filter and behaviour options recognised by the scanner.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanOptions {
    /// Only consider the direct children of each scanned root.
    pub skip_sub_dir: bool,
    pub skip_hidden_files: bool,
    pub skip_hidden_dirs: bool,
    pub skip_zero_len: bool,
    pub include_dir_regexes: Vec<String>,
    pub exclude_dir_regexes: Vec<String>,
    pub include_file_regexes: Vec<String>,
    pub exclude_file_regexes: Vec<String>,
    /// Emit a progress checkpoint every this many checked entries.
    pub report_frequency: u64,
    /// User the read-permission check is evaluated for. Defaults to the effective uid.
    pub test_uid: Option<u32>,
    /// Group the read-permission check is evaluated for. Defaults to the effective gid.
    pub test_gid: Option<u32>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_sub_dir: false,
            skip_hidden_files: false,
            skip_hidden_dirs: false,
            skip_zero_len: true,
            include_dir_regexes: Vec::new(),
            exclude_dir_regexes: Vec::new(),
            include_file_regexes: Vec::new(),
            exclude_file_regexes: Vec::new(),
            report_frequency: 10,
            test_uid: None,
            test_gid: None,
        }
    }
}

impl ScanOptions {
    /// Sets both hidden-file and hidden-directory skipping.
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden_files = skip;
        self.skip_hidden_dirs = skip;
        self
    }

    /// Validate the options and compile the regexes. This is the only place option
    /// errors surface; scanning never fails on them afterwards.
    pub fn compile(&self) -> Result<ScanConfig> {
        if self.report_frequency == 0 {
            return Err(Error::InvalidOptions(
                "report_frequency must be at least 1".to_string(),
            ));
        }

        Ok(ScanConfig {
            skip_sub_dir: self.skip_sub_dir,
            skip_hidden_files: self.skip_hidden_files,
            skip_hidden_dirs: self.skip_hidden_dirs,
            skip_zero_len: self.skip_zero_len,
            include_dirs: compile_patterns(&self.include_dir_regexes)?,
            exclude_dirs: compile_patterns(&self.exclude_dir_regexes)?,
            include_files: compile_patterns(&self.include_file_regexes)?,
            exclude_files: compile_patterns(&self.exclude_file_regexes)?,
            report_frequency: self.report_frequency,
            test_uid: self.test_uid.unwrap_or_else(platform::effective_uid),
            test_gid: self.test_gid.unwrap_or_else(platform::effective_gid),
        })
    }
}

/// Compiled, immutable form of [`ScanOptions`] shared by a scan pass.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub skip_sub_dir: bool,
    pub skip_hidden_files: bool,
    pub skip_hidden_dirs: bool,
    pub skip_zero_len: bool,
    pub include_dirs: Vec<Regex>,
    pub exclude_dirs: Vec<Regex>,
    pub include_files: Vec<Regex>,
    pub exclude_files: Vec<Regex>,
    pub report_frequency: u64,
    pub test_uid: u32,
    pub test_gid: u32,
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Configuration consumed by the command line driver.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub query_items: Vec<String>,
    pub canonical_dir: Option<String>,
    pub scan: ScanOptions,
    /// Canonical-side override; the query-side options are used when absent.
    pub canonical_scan: Option<ScanOptions>,
    pub matching: MatchFlags,
}

/// Optional `Config.toml` in the working directory, overridden by `CANON_DUPES__*`
/// environment variables.
pub fn load_configuration() -> Result<AppConfig> {
    load_from(ConfigFile::with_name("Config").required(false))
}

fn load_from<S>(file: S) -> Result<AppConfig>
where
    S: Source + Send + Sync + 'static,
{
    let config = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix("CANON_DUPES").separator("__"))
        .build()?;
    Ok(config.try_deserialize::<AppConfig>()?)
}
