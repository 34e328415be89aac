//! Tracing setup: a daily log file next to the settings, warnings on stderr.

use std::path::PathBuf;

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::get_home_dir;

/// Filter directives, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "EDEN_LOG";

/// Overrides the log directory (default `~/.eden/logs`).
pub const LOG_DIR_ENV: &str = "EDEN_LOG_DIR";

const DEFAULT_FILTER: &str = "info,eden=debug";
const LOG_FILE: &str = "eden.log";

/// Install the global subscriber and return the file writer's guard with the
/// log directory.
///
/// The guard must outlive every log call or buffered lines are lost. Stderr
/// only carries warnings and errors so `eden exec` output stays readable.
pub fn init() -> Result<(WorkerGuard, PathBuf)> {
    let log_dir = log_dir(std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directives = filter_directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    let (filter, rejected) = match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(e)),
    };

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(e) = rejected {
        tracing::warn!("Ignoring log filter '{}': {}", directives, e);
    }
    tracing::info!("Logging to {}", log_dir.join(LOG_FILE).display());

    Ok((guard, log_dir))
}

/// `EDEN_LOG` wins over `RUST_LOG`; blank values count as unset.
fn filter_directives(eden: Option<String>, rust: Option<String>) -> String {
    [eden, rust]
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn log_dir(configured: Option<PathBuf>) -> Result<PathBuf> {
    match configured {
        Some(dir) => Ok(dir),
        None => Ok(get_home_dir()?.join("logs")),
    }
}
