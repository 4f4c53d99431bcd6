//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{SyncError, SyncResult};

/// Install a global fmt subscriber. `RUST_LOG` wins over `config.log_level`.
///
/// Returns an error if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> SyncResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| SyncError::Config(format!("invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| SyncError::Config(format!("logging already initialised: {}", e)))
}
