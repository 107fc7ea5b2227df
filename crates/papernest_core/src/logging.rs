//! File logging for the project store.
//!
//! Events are single-line `key=value` records carrying ids, counts and
//! durations. Paper titles, abstracts and note text never reach the log.
//!
//! One process writes to one directory at one level; asking again with the
//! same pair is a no-op, anything else is refused.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "papernest";
const ROTATE_AT_BYTES: u64 = 4 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 3;

static ACTIVE_LOG: OnceCell<ActiveLog> = OnceCell::new();

struct ActiveLog {
    filter: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// Logging already runs with a different directory or level.
    AlreadyActive { dir: PathBuf, filter: LevelFilter },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(raw) => write!(
                f,
                "unknown log level `{raw}`; expected off|error|warn|info|debug|trace"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory `{}` must be absolute", dir.display())
            }
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "logger backend failed: {err}"),
            Self::AlreadyActive { dir, filter } => write!(
                f,
                "logging already writes to `{}` at level {filter}",
                dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::UnknownLevel(_) | Self::RelativeDir(_) | Self::AlreadyActive { .. } => None,
        }
    }
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Parses a level name, ignoring case and surrounding blanks.
pub fn parse_log_level(raw: &str) -> Result<LevelFilter, LoggingError> {
    raw.trim()
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::UnknownLevel(raw.trim().to_string()))
}

/// Starts rolling file logs under `dir`.
///
/// # Errors
/// - `UnknownLevel` / `RelativeDir` for bad input; nothing is started.
/// - `AlreadyActive` when a different directory or level is already live.
pub fn init_logging(level: &str, dir: &Path) -> Result<(), LoggingError> {
    let filter = parse_log_level(level)?;
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir.to_path_buf()));
    }

    let active = ACTIVE_LOG.get_or_try_init(|| start_file_logger(filter, dir))?;
    if active.dir != dir || active.filter != filter {
        return Err(LoggingError::AlreadyActive {
            dir: active.dir.clone(),
            filter: active.filter,
        });
    }
    Ok(())
}

fn start_file_logger(filter: LevelFilter, dir: &Path) -> Result<ActiveLog, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(filter).build())
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    info!(
        "event=app_start module=core status=ok platform={} version={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "event=logging_init module=core status=ok level={} log_dir={}",
        filter,
        dir.display()
    );

    Ok(ActiveLog {
        filter,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}
