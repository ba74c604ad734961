//! Tracing subscriber setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean for results (and `--json`).
//! `RUST_LOG`, when set, takes precedence over the configured level.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, fmt};

/// Filter from `RUST_LOG`, falling back to `level`.
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let builder = fmt::fmt()
        .with_env_filter(build_env_filter(&config.level))
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    }
}
