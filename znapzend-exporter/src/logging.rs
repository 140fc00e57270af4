//! Tracing subscriber setup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

/// Level used when the configured one does not parse.
pub const FALLBACK_LEVEL: &str = "info";

/// Build the filter for `level`, falling back to [`FALLBACK_LEVEL`].
///
/// Returns the filter and, on fallback, the parse error message.
pub fn build_filter(level: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(FALLBACK_LEVEL), Some(e.to_string())),
    }
}

/// Install the global subscriber writing to stdout through a non-blocking
/// writer.
///
/// The returned guard must be held for the lifetime of the program so
/// buffered lines are flushed on exit.
pub fn init_logging(level: &str, format: LogFormat) -> WorkerGuard {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let (filter, fallback) = build_filter(level);

    let builder = tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    if let Some(error) = fallback {
        tracing::warn!(
            level = %level,
            fallback = FALLBACK_LEVEL,
            error = %error,
            "Invalid log level, using fallback"
        );
    }
    guard
}
