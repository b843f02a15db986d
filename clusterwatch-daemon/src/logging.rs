//! Logging setup
//! Console output plus optional rolling JSON log files

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogRotation, LoggingConfig};

const LOG_FILE_NAME: &str = "clusterwatch.log";

/// Logging initialization errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{0}': {1}")]
    Filter(String, String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::Filter(config.level.clone(), e.to_string()))?,
    };

    let console_layer = if config.json {
        fmt::layer()
            .with_target(true)
            .json()
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_writer(std::io::stdout)
            .boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let file_appender = match config.rotation {
                LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_NAME),
                LogRotation::Daily => rolling::daily(dir, LOG_FILE_NAME),
                LogRotation::Never => rolling::never(dir, LOG_FILE_NAME),
            };
            let (writer, guard) = non_blocking(file_appender);

            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(level = %config.level, json = config.json, "Logging initialized");

    Ok(guard)
}

/// Log a detected transition with structured fields
#[macro_export]
macro_rules! log_transition {
    ($transition:expr) => {
        tracing::info!(
            event = $transition.kind(),
            cluster = %$transition.cluster(),
            "Cluster transition detected"
        )
    };
    ($transition:expr, $($key:ident = $value:expr),+) => {
        tracing::info!(
            event = $transition.kind(),
            cluster = %$transition.cluster(),
            $($key = $value),+,
            "Cluster transition detected"
        )
    };
}
