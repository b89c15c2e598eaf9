use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "subtitle_sink=info";
const VERBOSE_LOG_FILTER: &str = "subtitle_sink=debug";

/// Install the global subscriber. Logs go to stderr, or to `log_file` when
/// one is configured.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let Some(path) = log_file else {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("LogFile {} does not name a file", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    builder
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    Ok(Some(guard))
}
