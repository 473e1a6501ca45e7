//! Storage client configuration
//!
//! A `StorageConfig` is supplied once when the client is constructed and is
//! never changed afterwards. Values can come from code, the environment or a
//! TOML file (with the `config-file` feature).

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Greenfield testnet chain id
pub const DEFAULT_CHAIN_ID: &str = "5600";
/// Greenfield testnet full node RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://gnfd-testnet-fullnode-tendermint-us.bnbchain.org";
/// Greenfield testnet storage provider endpoint
pub const DEFAULT_ENDPOINT: &str = "https://gnfd-testnet-sp1.bnbchain.org";
pub const DEFAULT_BUCKET: &str = "toolchain-assets";

/// Configuration for the storage client
///
/// # Example
///
/// ```rust
/// use greenfield_client_sdk::config::StorageConfig;
///
/// let config = StorageConfig::default()
///     .with_bucket("my-assets")
///     .with_timeout(10);
/// assert_eq!(config.bucket_name, "my-assets");
/// assert_eq!(config.chain_id, "5600");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Chain/network identifier passed to the connection constructor
    pub chain_id: String,
    /// RPC endpoint of the chain full node
    pub rpc_url: String,
    /// Storage service endpoint used to build object URLs
    pub endpoint: String,
    /// Bucket used when an operation does not name one
    pub bucket_name: String,
    /// Timeout applied to every transport call, in seconds
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            bucket_name: DEFAULT_BUCKET.to_string(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl StorageConfig {
    pub fn new(
        chain_id: impl Into<String>,
        rpc_url: impl Into<String>,
        endpoint: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            rpc_url: rpc_url.into(),
            endpoint: endpoint.into(),
            bucket_name: bucket_name.into(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Set the chain id
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    /// Set the RPC endpoint
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Set the storage endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the default bucket
    pub fn with_bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = bucket_name.into();
        self
    }

    /// Set the transport timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Create from environment variables
    ///
    /// Reads `GREENFIELD_CHAIN_ID`, `GREENFIELD_RPC_URL`, `GREENFIELD_ENDPOINT`,
    /// `GREENFIELD_BUCKET` and `GREENFIELD_TIMEOUT_SECONDS`. Unset variables keep
    /// their testnet defaults.
    pub fn from_env() -> StorageResult<Self> {
        let mut config = Self::default();

        if let Ok(chain_id) = std::env::var("GREENFIELD_CHAIN_ID") {
            config.chain_id = chain_id;
        }
        if let Ok(rpc_url) = std::env::var("GREENFIELD_RPC_URL") {
            config.rpc_url = rpc_url;
        }
        if let Ok(endpoint) = std::env::var("GREENFIELD_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(bucket) = std::env::var("GREENFIELD_BUCKET") {
            config.bucket_name = bucket;
        }
        if let Ok(timeout) = std::env::var("GREENFIELD_TIMEOUT_SECONDS") {
            config.timeout_seconds = timeout.parse().map_err(|_| {
                StorageError::ConfigError(format!(
                    "GREENFIELD_TIMEOUT_SECONDS is not a number: {}",
                    timeout
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(content: &str) -> StorageResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StorageError::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    #[cfg(feature = "config-file")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check that every field is usable
    pub fn validate(&self) -> StorageResult<()> {
        let required = [
            ("chain_id", &self.chain_id),
            ("rpc_url", &self.rpc_url),
            ("endpoint", &self.endpoint),
            ("bucket_name", &self.bucket_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(StorageError::ConfigError(format!("{} cannot be empty", name)));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(StorageError::ConfigError(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Public URL of an object in `bucket`
    pub fn object_url(&self, bucket: &str, object_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            bucket,
            object_name
        )
    }
}
