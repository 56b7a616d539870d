//! Logging setup.
//!
//! Console output goes to stderr so it never mixes with a stdio transport.
//! It defaults to the configured level and honours `RUST_LOG`. An optional
//! log file receives everything at DEBUG and is truncated on startup.

use std::fs::File;
use std::sync::Arc;

use tracing::{Level, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use super::config::LoggingConfig;
use super::error::{Error, Result};

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn console_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).as_str().to_lowercase()));
    match "rmcp=warn".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install the global subscriber.
///
/// Fails only if the log file cannot be created.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter(&config.level));

    let file_layer = match &config.file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                Error::config(format!("cannot create log file {}: {e}", path.display()))
            })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    if let Some(path) = &config.file {
        info!("Writing DEBUG logs to {}", path.display());
    }
    Ok(())
}
