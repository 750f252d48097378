use crate::settings::{AppSettings, APP_DIR};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "permissions.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub log_to_file: bool,
    pub log_dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            level: settings.log_level.clone(),
            log_to_file: settings.log_to_file,
            log_dir: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cache dir not found")]
    CacheDirMissing,
    #[error("could not create log dir: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

pub fn log_directory(custom: Option<&PathBuf>) -> Result<PathBuf, LoggingError> {
    let dir = match custom {
        Some(dir) => dir.clone(),
        None => dirs::cache_dir()
            .ok_or(LoggingError::CacheDirMissing)?
            .join(APP_DIR),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Install the global subscriber: console output filtered by `RUST_LOG`
/// (falling back to the configured level), plus `permissions.log` in the
/// cache dir when file logging is on.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and closes the log file.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        );

    let (file_layer, guard) = if config.log_to_file {
        let dir = log_directory(config.log_dir.as_ref())?;
        let appender = tracing_appender::rolling::never(dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(&config.level));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(level = %config.level, file = config.log_to_file, "logging initialized");
    Ok(guard)
}
