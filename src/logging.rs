//! # Structured Logging Module
//!
//! Environment-aware structured logging that writes human-readable output
//! to the console and JSON lines to a per-process log file, for debugging
//! generation runs after the fact.
//!
//! Host applications call [`init_structured_logging`] once at startup,
//! before constructing a
//! [`GenerationCoordinator`](crate::orchestration::GenerationCoordinator).
//! The log directory defaults to `log/` and can be overridden with
//! `SCAFFOLD_LOG_DIR`.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
/// Idempotent; later calls are no-ops.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let log_dir = get_log_directory();
        if !log_dir.exists() {
            if let Err(error) = fs::create_dir_all(&log_dir) {
                eprintln!("failed to create log directory: {error}");
                return;
            }
        }

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_path = log_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level)),
            );

        // A global subscriber may already be set by an embedding binary
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_path.display(),
            "Structured logging initialized"
        );

        // Keep the appender guard alive for the process lifetime
        std::mem::forget(guard);
    });
}

/// Current environment from environment variables
fn get_environment() -> String {
    std::env::var("SCAFFOLD_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Directory JSON log files are written to
fn get_log_directory() -> PathBuf {
    std::env::var("SCAFFOLD_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("log"))
}
