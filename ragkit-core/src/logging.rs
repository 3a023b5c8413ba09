//! Tracing setup for binaries
//!
//! Library code only emits `tracing` events; a binary picks one of the two
//! initializers below once at startup. `RUST_LOG`, when set, wins over the
//! level passed in.
//!
//! ```rust,no_run
//! use ragkit_core::logging::init_logging;
//!
//! init_logging("logs", "ragkit.log", "info").unwrap();
//! ```

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Human-readable stderr output plus JSON lines in a daily rotated file
///
/// - `directory`: where the log files go (created if missing)
/// - `filename_prefix`: file name stem, e.g. `ragkit.log`
/// - `level`: fallback filter such as `info` or `ragkit_core=debug`
pub fn init_logging(directory: &str, filename_prefix: &str, level: &str) -> Result<()> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(filename_prefix)
        .build(directory)
        .map_err(|e| Error::Internal(format!("Failed to create log appender: {}", e)))?;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer())
        .with(fmt::layer().json().with_writer(appender))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to init tracing: {}", e)))
}

/// Human-readable stderr output only
///
/// stdout is left to the program's own output (answers, ranked passages).
pub fn init_console_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer())
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to init tracing: {}", e)))
}

fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();

        // Only one global subscriber per process; later calls report failure.
        let _ = init_logging(&path, "ragkit.log", "info");
        assert!(init_console_logging("info").is_err());
    }
}
