//! Diagnostic logging through `tracing`.
//!
//! Terminal output goes to stderr so it never mixes with `--format json`
//! on stdout. The log file under the configured directory rolls over daily
//! and can be written as JSON lines. This is separate from the activity
//! log, which is user-facing and lives in the key-value store.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::LOG_FILE_NAME;
use crate::error::{RoError, RoResult};

/// Keeps the background file writer alive; dropping it flushes the file.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber. `level` is an `EnvFilter` directive such
/// as `"debug"` or `"ro_services=trace,info"`; an unparsable one falls back
/// to `info`. Fails if a subscriber is already installed.
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> RoResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_NAME));
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    // Exactly one of these is set.
    let (json_file, text_file) = if json_output {
        let layer = fmt::layer()
            .with_writer(writer)
            .json()
            .with_file(true)
            .with_line_number(true);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(json_file)
        .with(text_file)
        .try_init()
        .map_err(|e| RoError::Internal(format!("logging already initialized: {e}")))?;

    tracing::debug!("logging to {} at level {level}", log_dir.display());
    Ok(LogGuard { _guard: guard })
}
