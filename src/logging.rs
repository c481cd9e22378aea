use crate::config::AppConfig;
use crate::ledger::TRACE_TARGET;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directive string for the subscriber filter.
///
/// Per-step transfer tracing is switched off unless `enable_tracing` is set.
pub fn filter_directives(config: &AppConfig) -> String {
    if config.enable_tracing {
        format!("{},{}=debug", config.log_level, TRACE_TARGET)
    } else {
        format!("{},{}=off", config.log_level, TRACE_TARGET)
    }
}

fn rotation(config: &AppConfig) -> Rotation {
    match config.rotation.as_str() {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

fn prepare_log_dir(dir: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Install the global subscriber. Keep the guard alive until exit or
/// buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    // Reported once the subscriber is up; the appender retries on write.
    let log_dir_error = prepare_log_dir(&config.log_dir).err();
    let appender = RollingFileAppender::new(rotation(config), &config.log_dir, &config.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }

    if let Some(e) = log_dir_error {
        tracing::warn!(log_dir = %config.log_dir, error = %e, "Cannot create log directory");
    }
    tracing::debug!(
        log_dir = %config.log_dir,
        rotation = %config.rotation,
        json = config.use_json,
        "Logging initialized"
    );
    guard
}
