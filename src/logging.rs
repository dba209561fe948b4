//! Console and rolling-file logging.

use std::path::Path;

use clap::ValueEnum;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AppError;

pub const LOG_FILE_PREFIX: &str = "kofia_fundstat";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Level handed to the filter when `RUST_LOG` is unset.
pub fn effective_level(level: &str, debug: bool) -> Result<tracing::Level, AppError> {
    if debug {
        return Ok(tracing::Level::DEBUG);
    }
    level
        .parse()
        .map_err(|_| AppError::invalid("log-level", format!("unknown level `{level}`")))
}

/// Install the global subscriber; console output goes to stderr. The
/// returned guard flushes the file writer on drop and must live until the
/// process exits.
pub fn init_logging(
    level: &str,
    debug: bool,
    format: LogFormat,
    log_dir: &Path,
) -> Result<WorkerGuard, AppError> {
    let level = effective_level(level, debug)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|err| AppError::Logging(err.to_string()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|err| AppError::Logging(err.to_string()))?;
    Ok(guard)
}
