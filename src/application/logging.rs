//! # Logging
//!
//! Sets up `tracing` with a file layer in the configured log directory and a
//! stdout layer. `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingConfig;

pub const DEFAULT_FILTER: &str =
    "info,serenity=warn,tracing::span=warn,h2=warn,hyper=warn,rustls=warn";

/// Installs the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    let directory = Path::new(&config.directory);
    if !directory.exists() {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
    }

    // Start every run with a fresh log.
    let log_path = directory.join(&config.file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(directory, &config.file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
