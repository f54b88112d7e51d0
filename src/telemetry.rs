//! Logging setup
//!
//! The library only emits `tracing` events; applications decide whether to
//! install a subscriber. These helpers install the usual `fmt` subscriber.

use crate::error::{Error, Result};
use crate::types::LogLevel;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` plus `default_level`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(default_level: LogLevel) -> bool {
    let level: tracing::Level = default_level.into();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .is_ok()
}

/// Install a `fmt` subscriber with an explicit filter such as
/// `"pagewalk=debug,reqwest=warn"`
pub fn init_logging_with_filter(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| Error::invalid_value("log filter", e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to install logger: {e}")))
}
