mod cli;
mod logging;
mod progress;
mod report;

use anyhow::{bail, Context, Result};
use canon_dupes::config::{load_configuration, AppConfig};
use canon_dupes::{MatchFlags, ScanOptions, Session};
use clap::{CommandFactory, Parser};
use cli::{Cli, CompareArgs, Commands};
use colored::*;
use dotenv::dotenv;
use progress::CliReporter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

fn main() -> Result<()> {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(args.verbose);

    let config = load_configuration().context("loading configuration")?;

    match args.command {
        Some(Commands::Compare(compare_args)) => run_compare(config, compare_args)?,
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_compare(config: AppConfig, args: CompareArgs) -> Result<()> {
    let (query_items, canonical_dir) = resolve_paths(&config, &args)?;
    let query_options = apply_scan_args(config.scan.clone(), &args);
    let canonical_options = match &config.canonical_scan {
        Some(options) => apply_scan_args(options.clone(), &args),
        None => query_options.clone(),
    };
    let flags = apply_match_args(config.matching, &args);

    debug!("query items: {:?}", query_items);
    debug!("canonical dir: {:?}", canonical_dir);
    debug!("match flags: {:?}", flags);

    let mut session = Session::with_canonical_options(
        &query_items,
        &canonical_dir,
        &query_options,
        &canonical_options,
    )?;
    let mut reporter = CliReporter::new();

    let start = Instant::now();
    reporter.on_scan_start("query");
    for checked in session.do_query_scan()? {
        reporter.on_scan_progress("query", checked);
    }
    reporter.on_scan_complete("Query", session.query_scan(), start.elapsed());

    let start = Instant::now();
    reporter.on_scan_start("canonical");
    for checked in session.do_canonical_scan()? {
        reporter.on_scan_progress("canonical", checked);
    }
    if let Some(index) = session.canonical_index() {
        reporter.on_scan_complete("Canonical", index.scan(), start.elapsed());
    }

    let start = Instant::now();
    reporter.on_compare_start(session.query_scan().len());
    for compared in session.do_compare(flags)? {
        reporter.on_compare_progress(compared);
    }
    reporter.on_compare_complete(session.outcome(), start.elapsed());

    println!();
    report::print_summary(&session);
    if args.show_matches {
        report::print_matches(&session);
    }
    if let Some(csv_path) = &args.csv {
        report::write_csv(&session, csv_path)?;
    }

    info!("{}", "Done".green());
    Ok(())
}

fn resolve_paths(config: &AppConfig, args: &CompareArgs) -> Result<(Vec<PathBuf>, PathBuf)> {
    if let Some((canonical, query)) = args.paths.split_last() {
        if query.is_empty() {
            bail!("expected one or more query items followed by the canonical directory");
        }
        return Ok((query.to_vec(), canonical.clone()));
    }

    let Some(canonical) = config.canonical_dir.as_ref() else {
        bail!("no canonical directory given on the command line or in the configuration");
    };
    if config.query_items.is_empty() {
        bail!("no query items given on the command line or in the configuration");
    }
    let query = config.query_items.iter().map(PathBuf::from).collect();
    Ok((query, PathBuf::from(canonical)))
}

fn apply_scan_args(mut options: ScanOptions, args: &CompareArgs) -> ScanOptions {
    options.skip_sub_dir |= args.skip_sub_dir;
    if args.skip_hidden {
        options = options.with_skip_hidden(true);
    }
    if args.keep_zero_len {
        options.skip_zero_len = false;
    }
    options.include_dir_regexes.extend(args.include_dirs.iter().cloned());
    options.exclude_dir_regexes.extend(args.exclude_dirs.iter().cloned());
    options.include_file_regexes.extend(args.include_files.iter().cloned());
    options.exclude_file_regexes.extend(args.exclude_files.iter().cloned());
    if let Some(frequency) = args.report_frequency {
        options.report_frequency = frequency;
    }
    options
}

fn apply_match_args(mut flags: MatchFlags, args: &CompareArgs) -> MatchFlags {
    flags.name |= args.name;
    flags.file_type |= args.file_type;
    flags.parent |= args.parent;
    flags.rel_path |= args.rel_path;
    flags.ctime |= args.ctime;
    flags.mtime |= args.mtime;
    flags.skip_checksum |= args.skip_checksum;
    flags
}
