//! # Logging Setup
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` (config directive,
//! `RUST_LOG` wins), a stderr layer, and an optional plain-text file layer.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingConfig;

/// Verbose mode lifts this crate to `debug` while HTTP internals stay at `info`.
const VERBOSE_DIRECTIVE: &str = "agent_sandbox=debug,info";

/// The configured directive, unless verbose mode replaces the default one.
fn filter_directive(config: &LoggingConfig, verbose: bool) -> &str {
    if verbose && config.filter == "info" {
        VERBOSE_DIRECTIVE
    } else {
        config.filter.as_str()
    }
}

/// Keep the returned guard alive until exit, or buffered file lines are lost.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let directive = filter_directive(config, verbose);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .with_context(|| format!("Invalid log filter '{}'", directive))?;

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", file))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
