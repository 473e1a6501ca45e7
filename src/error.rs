//! Error types for storage client operations
//!
//! Two channels exist side by side. Guard errors (`NotInitialized`,
//! `WalletNotConnected`) are always surfaced to the caller. Everything else is
//! an operation outcome: some operations return it, the read/query paths log
//! it and fall back to a default value.

use thiserror::Error;

/// Errors that can occur while talking to the storage service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The storage client has not completed `initialize`
    #[error("Greenfield client not initialized. Call initialize() first.")]
    NotInitialized,

    /// The session controller has no connected wallet
    #[error("Greenfield client not initialized. Please connect your wallet first.")]
    WalletNotConnected,

    /// The supplied account address cannot be used as an identity
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Failed to construct a connection handle
    #[error("Failed to connect to storage service: {0}")]
    ConnectionError(String),

    /// Transport-level failure during a call
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Object, bucket or account does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend rejected the request
    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Transport call exceeded the configured timeout
    #[error("Storage request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Whether this is a guard error raised before any transport call
    pub fn is_not_initialized(&self) -> bool {
        matches!(
            self,
            StorageError::NotInitialized | StorageError::WalletNotConnected
        )
    }

    /// Check if this error is retryable
    ///
    /// The client never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::ConnectionError(_)
                | StorageError::NetworkError(_)
                | StorageError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
