//! Error types for the inspection sync core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote rejected request: {0}")]
    RemoteRejected(String),

    #[error("Malformed seed data: {0}")]
    MalformedSeedData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record is not editable: {0}")]
    NotEditable(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Transport failures worth retrying. Offline and server rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::RemoteRejected(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(SyncError::NetworkUnavailable.to_string(), "Network unavailable");

        let err = SyncError::RetriesExhausted {
            attempts: 3,
            last_error: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "Gave up after 3 attempts: connection reset");
    }

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(SyncError::Network("timeout".to_string()).is_transient());
        assert!(!SyncError::NetworkUnavailable.is_transient());
        assert!(!SyncError::RemoteRejected("400".to_string()).is_transient());
        assert!(!SyncError::StorageFailure("locked".to_string()).is_transient());
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err: SyncError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, SyncError::Serialization(_)));
    }
}
