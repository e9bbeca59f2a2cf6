use std::fs;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::RunConfig;
use crate::error::{MailFetchError, Result};

/// Target for the full failure report. Only the log file receives it.
pub const FATAL_TARGET: &str = "mail_fetch::fatal";

/// Keeps the file writer alive. Dropping it flushes pending log lines.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Console at INFO (or `RUST_LOG`), file at TRACE for this crate.
pub fn init(config: &RunConfig) -> Result<LogGuard> {
    let log_dir = config.logs_dir();
    fs::create_dir_all(&log_dir).map_err(|e| MailFetchError::write(&log_dir, e))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, config.log_file_name());
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let fatal_off: Directive = format!("{FATAL_TARGET}=off")
        .parse()
        .map_err(|e| MailFetchError::Logging(format!("bad filter directive: {e}")))?;
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(fatal_off);
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_filter(console_filter);

    let file_filter = Targets::new()
        .with_target(env!("CARGO_CRATE_NAME"), Level::TRACE)
        .with_default(Level::INFO);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MailFetchError::Logging(e.to_string()))?;

    Ok(LogGuard { _file: guard })
}
