//! Logging Infrastructure
//!
//! Structured logging setup: stdout by default, daily rolling files when a
//! log directory is configured and exists.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists() {
            let file_appender = tracing_appender::rolling::daily(log_path, "tandoor-sync");
            // try_init: a second call (tests, embedding) keeps the first subscriber
            let _ = subscriber.with_writer(file_appender).with_ansi(false).try_init();
            return;
        }
        eprintln!("Log directory {dir} does not exist, logging to stdout");
    }

    let _ = subscriber.try_init();
}
