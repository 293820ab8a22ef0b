use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "canon-dupes")]
#[command(about = "Find query files that already exist in a canonical directory", long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace); TRACING_LEVEL overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare query files/directories against a canonical directory
    Compare(CompareArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// One or more query directories or files followed by the canonical directory.
    /// Falls back to `query_items`/`canonical_dir` from the configuration when empty.
    pub paths: Vec<PathBuf>,

    /// Candidates must also share the file name
    #[arg(long)]
    pub name: bool,
    /// Candidates must also share the file extension
    #[arg(long)]
    pub file_type: bool,
    /// Candidates must also share the parent directory name
    #[arg(long)]
    pub parent: bool,
    /// Candidates must also share the path relative to their scan root
    #[arg(long)]
    pub rel_path: bool,
    /// Candidates must also share the creation time
    #[arg(long)]
    pub ctime: bool,
    /// Candidates must also share the modification time
    #[arg(long)]
    pub mtime: bool,
    /// Trust the attribute match and skip reading content (requires --name)
    #[arg(long, requires = "name")]
    pub skip_checksum: bool,

    /// Only scan the top level of each directory
    #[arg(long)]
    pub skip_sub_dir: bool,
    /// Skip hidden files and directories
    #[arg(long)]
    pub skip_hidden: bool,
    /// Keep zero length files (skipped by default)
    #[arg(long)]
    pub keep_zero_len: bool,
    /// Only scan directories matching this regex (repeatable)
    #[arg(long = "include-dir", value_name = "REGEX")]
    pub include_dirs: Vec<String>,
    /// Skip directories matching this regex (repeatable)
    #[arg(long = "exclude-dir", value_name = "REGEX")]
    pub exclude_dirs: Vec<String>,
    /// Only scan files whose name matches this regex (repeatable)
    #[arg(long = "include-file", value_name = "REGEX")]
    pub include_files: Vec<String>,
    /// Skip files whose name matches this regex (repeatable)
    #[arg(long = "exclude-file", value_name = "REGEX")]
    pub exclude_files: Vec<String>,
    /// Report scan progress every N files
    #[arg(long)]
    pub report_frequency: Option<u64>,

    /// Write a CSV classification report to this file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
    /// Print every duplicate and unique path after the summary
    #[arg(long)]
    pub show_matches: bool,
}
