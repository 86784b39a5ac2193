//! Tracing subscriber setup
//!
//! Logs go to stderr so streamed advice on stdout stays clean. `RUST_LOG`
//! directives override the configured level.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use crate::config::LoggingConfig;

/// Default level from config, raised to debug by `verbose`
pub fn level(config: &LoggingConfig, verbose: bool) -> Result<LevelFilter> {
    if verbose {
        return Ok(LevelFilter::DEBUG);
    }
    config
        .level
        .parse::<LevelFilter>()
        .with_context(|| format!("Invalid log level '{}'", config.level))
}

pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = level(config, verbose)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("Invalid RUST_LOG directives")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(verbose)
        .with_line_number(verbose);

    let installed = if config.format == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("Failed to install tracing subscriber")?;
    Ok(())
}
