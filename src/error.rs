//! Error types for the guided tour.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors from analytics and action-tracking sinks.
///
/// These never reach tour callers; the notifier logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Sink {sink} request failed: {reason}")]
    RequestFailed { sink: String, reason: String },

    #[error("Sink {sink} rejected event with status {status}")]
    Rejected { sink: String, status: u16 },
}

/// Step catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog is empty")]
    Empty,

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),
}

/// Result type alias for the guided tour.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_errors_convert_into_error() {
        let err: Error = StoreError::Connection("disk full".to_string()).into();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.to_string(), "Store error: Connection error: disk full");

        let err: Error = CatalogError::Empty.into();
        assert_eq!(err.to_string(), "Catalog error: Catalog is empty");
    }
}
