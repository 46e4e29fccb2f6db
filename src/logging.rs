//! Tracing setup for filegate.
//!
//! Events are written to stdout and, unless `logging.file` is empty, to a
//! log file as well. HTTP requests run inside a `request` span created by
//! [`http_span`]; the auth extractors fill in its `user_id` field once a
//! token has been verified, so every event logged while serving a request
//! carries the caller.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use axum::extract::Request;
use tracing::{Level, Span};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{FilegateError, Result};

/// Name of the per-request span.
pub const REQUEST_SPAN: &str = "request";

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` wins; the configured level applies to everything else.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(parse_level(level).into())
        .from_env_lossy()
}

fn open_log_file(path: &str) -> Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::options().create(true).append(true).open(path)?)
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level);
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    let installed = if config.file.is_empty() {
        tracing_subscriber::registry()
            .with(layer.with_writer(std::io::stdout))
            .with(filter)
            .try_init()
    } else {
        let log_file = Arc::new(open_log_file(&config.file)?);
        tracing_subscriber::registry()
            .with(
                layer
                    .with_ansi(false)
                    .with_writer(std::io::stdout.and(log_file)),
            )
            .with(filter)
            .try_init()
    };

    installed.map_err(|e| FilegateError::Config(format!("logging already initialized: {e}")))
}

/// Console-only fallback when [`init`] fails.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(build_filter(level))
        .try_init();
}

/// Span for one HTTP request. `user_id` starts empty.
pub fn http_span(request: &Request) -> Span {
    tracing::info_span!(
        REQUEST_SPAN,
        method = %request.method(),
        path = %request.uri().path(),
        user_id = tracing::field::Empty,
    )
}

/// Attach the authenticated caller to the current request span.
pub fn record_caller(user_id: &str) {
    Span::current().record("user_id", user_id);
}
