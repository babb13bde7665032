//! Structured logging setup using the `tracing` ecosystem.
//!
//! The log file receives everything at the configured level. The console
//! (stderr, so `--format json` stdout stays clean) only shows warnings unless
//! verbose output is requested.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{CcError, CcResult};

/// Dependencies whose debug output drowns out ours.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "r2d2"];

/// Log file name prefix; the appender adds the date.
const LOG_FILE_PREFIX: &str = "campus-companion.log";

/// Build the filter directive for `level`, keeping chatty dependencies at warn.
/// A level that already names targets is used as given.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let mut directive = if level.is_empty() { "info".to_string() } else { level.to_string() };
    for target in QUIET_TARGETS {
        directive.push_str(&format!(",{target}=warn"));
    }
    directive
}

/// Initialize the global tracing subscriber.
///
/// `verbose` raises the file level to debug and echoes everything to the
/// console.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path, verbose: bool) -> CcResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = if verbose { "debug" } else { config.level.as_str() };
    let env_filter = EnvFilter::try_new(filter_directive(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_level = if verbose { LevelFilter::TRACE } else { LevelFilter::WARN };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .compact()
        .with_filter(console_level);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let init_result = if config.json_output {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        registry.with(file_layer).try_init()
    } else {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);
        registry.with(file_layer).try_init()
    };
    init_result.map_err(|e| CcError::Internal(format!("failed to install subscriber: {e}")))?;

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Keeps the non-blocking log writer alive. Drop to flush.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Console-only logger for tests.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directive(level)))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
