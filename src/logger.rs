use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;
use thiserror::Error;

/// Environment variable naming an optional log file.
pub const LOG_FILE_ENV: &str = "HYPERCMD_LOG_FILE";

const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("unable to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("logger already initialized: {0}")]
    AlreadyInitialized(#[from] SetLoggerError),
}

/// Logger settings, normally read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            file: None,
        }
    }
}

impl LogConfig {
    /// Read `RUST_LOG` (a level filter, `warn` if unset or invalid) and `HYPERCMD_LOG_FILE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var("RUST_LOG").ok().as_deref(),
            std::env::var_os(LOG_FILE_ENV).map(PathBuf::from),
        )
    }

    #[must_use]
    pub fn parse(level: Option<&str>, file: Option<PathBuf>) -> Self {
        Self {
            level: level
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_LEVEL),
            file: file.filter(|path| !path.as_os_str().is_empty()),
        }
    }
}

struct HyperLogger {
    file: Option<Mutex<File>>,
    filter: LevelFilter,
    start: Instant,
}

struct Line<'a, 'r> {
    elapsed: Duration,
    record: &'a Record<'r>,
}

impl fmt::Display for Line<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}s] [{}] {}: {}",
            self.elapsed.as_secs_f64(),
            self.record.level(),
            self.record.target(),
            self.record.args()
        )
    }
}

impl Log for HyperLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Line {
            elapsed: self.start.elapsed(),
            record,
        };
        let _ = writeln!(io::stderr(), "{line}");
        if let Some(ref file) = self.file {
            let _ = writeln!(file.lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Install the global logger.
///
/// # Errors
///
/// Returns `LoggerError::File` if the log file cannot be created, or
/// `LoggerError::AlreadyInitialized` if a logger is already installed.
pub fn init(config: &LogConfig) -> Result<(), LoggerError> {
    let file = config
        .file
        .as_ref()
        .map(|path| {
            File::create(path).map_err(|source| LoggerError::File {
                path: path.clone(),
                source,
            })
        })
        .transpose()?;

    let logger = HyperLogger {
        file: file.map(Mutex::new),
        filter: config.level,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(config.level);
    Ok(())
}
