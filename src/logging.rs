use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/canon-dupes.log";

/// Where and how much to log, resolved from the environment and the `-v` count.
#[derive(Debug)]
struct LogSettings {
    filter: String,
    directory: PathBuf,
    file_name: PathBuf,
}

impl LogSettings {
    fn resolve(verbosity: u8) -> Self {
        // An explicit TRACING_LEVEL always wins over -v.
        let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| {
            match verbosity {
                0 => "info",
                1 => "canon_dupes=debug,info",
                _ => "canon_dupes=trace,debug",
            }
            .to_string()
        });

        let path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let path = Path::new(&path);
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("canon-dupes.log"));

        Self {
            filter,
            directory,
            file_name,
        }
    }
}

/// Console layer on stderr (stdout is left to match listings), plain file layer
/// through a non-blocking appender. Keep the guard alive until exit.
pub fn init_logger(verbosity: u8) -> WorkerGuard {
    let settings = LogSettings::resolve(verbosity);

    let file_appender = tracing_appender::rolling::never(&settings.directory, &settings.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(EnvFilter::new(&settings.filter))
        .init();

    debug!("Logging configured: {:?}", settings);
    guard
}
