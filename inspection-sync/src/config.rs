//! Session configuration
//!
//! Every section has a usable `Default`, so a host can start from
//! `InspectionConfig::default()` and only override what it needs. `load`
//! layers an optional file (TOML/YAML/JSON) and `INSPECTION__*` environment
//! variables on top of the defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Configuration for the local record store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file
    pub db_path: String,
    /// User operating this device; stamped onto new shifts
    pub user_id: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to enable WAL mode
    pub enable_wal: bool,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "inspections.db".to_string(),
            user_id: String::new(),
            max_connections: 4,
            enable_wal: true,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Server base URL
    pub server_url: String,
    /// Authentication token
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/api/v1".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

/// Retry policy for pushes that fail with a transient transport error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. 1 disables retrying.
    pub max_attempts: u32,
    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,
    /// Upper bound for any single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, caller-driven retry only.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Code table cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeTableConfig {
    /// Bundled water body seed file (JSON array)
    pub water_body_seed_path: Option<String>,
    /// Import from the seed file even when the API is reachable
    pub prefer_seed_file: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Top-level configuration for one application session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    pub store: StoreConfig,
    pub remote: RemoteConfig,
    pub retry: RetryPolicy,
    pub code_tables: CodeTableConfig,
    pub logging: LoggingConfig,
}

impl InspectionConfig {
    /// Load configuration from an optional file plus `INSPECTION__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("INSPECTION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: InspectionConfig = settings.try_deserialize()?;
        tracing::debug!(
            db_path = %loaded.store.db_path,
            server_url = %loaded.remote.server_url,
            "Loaded inspection config"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay_ms: 100,
            max_delay_ms: 500,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(70), Duration::from_millis(500));
    }

    #[test]
    fn test_load_from_toml_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[store]
db_path = "/tmp/field.db"
user_id = "idir\\jdoe"

[retry]
max_attempts = 5
"#
        )
        .unwrap();

        let loaded = InspectionConfig::load(Some(file.path())).unwrap();
        assert_eq!(loaded.store.db_path, "/tmp/field.db");
        assert_eq!(loaded.store.user_id, "idir\\jdoe");
        assert_eq!(loaded.retry.max_attempts, 5);
        assert_eq!(loaded.retry.base_delay_ms, 500);
        assert!(loaded.store.enable_wal);
        assert_eq!(loaded.remote.timeout_secs, 30);
    }

    #[test]
    fn test_missing_required_file_is_config_error() {
        let err = InspectionConfig::load(Some(Path::new("/nonexistent/inspection.toml")))
            .unwrap_err();
        assert!(matches!(err, crate::error::SyncError::Config(_)));
    }
}
