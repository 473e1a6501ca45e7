//! HTTP download gateway
//!
//! Fetches object content by hash from `{base_url}/download/{hash}`.
//! Used for downloads when a storage endpoint serves content over HTTP.
//!
//! ## Security
//!
//! Hashes are validated before they are placed in a URL path.
//! Only alphanumeric characters, hyphens, and underscores are allowed.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Maximum allowed length for an object hash
const MAX_HASH_LENGTH: usize = 128;

/// Validate an object hash for safe use in a URL path.
fn validate_hash(hash: &str) -> Result<(), StorageError> {
    if hash.is_empty() {
        return Err(StorageError::BackendError(
            "Object hash cannot be empty".to_string(),
        ));
    }

    if hash.len() > MAX_HASH_LENGTH {
        return Err(StorageError::BackendError(format!(
            "Object hash too long (max {} characters)",
            MAX_HASH_LENGTH
        )));
    }

    if !hash
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::BackendError(
            "Object hash contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// HTTP gateway that downloads objects by hash
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    timeout_seconds: u64,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a new gateway
    ///
    /// # Arguments
    ///
    /// * `base_url` - Storage endpoint (e.g., "https://gnfd-testnet-sp1.bnbchain.org")
    /// * `timeout_seconds` - Per-request timeout
    ///
    /// # Example
    ///
    /// ```rust
    /// use greenfield_client_sdk::storage::HttpGateway;
    ///
    /// let gateway = HttpGateway::new("https://gnfd-testnet-sp1.bnbchain.org", 30);
    /// assert_eq!(
    ///     gateway.download_url("gf_abc"),
    ///     "https://gnfd-testnet-sp1.bnbchain.org/download/gf_abc"
    /// );
    /// ```
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL an object hash is downloaded from
    pub fn download_url(&self, hash: &str) -> String {
        format!("{}/download/{}", self.base_url, urlencoding::encode(hash))
    }

    /// Fetch an object by hash
    ///
    /// Any non-success status is reported as `Ok(None)`; only transport
    /// failures are errors.
    pub async fn fetch(&self, hash: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_hash(hash)?;

        let url = self.download_url(hash);
        debug!("Fetching object from gateway: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout(self.timeout_seconds)
                } else {
                    StorageError::NetworkError(format!("Failed to fetch {}: {}", hash, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            if status != reqwest::StatusCode::NOT_FOUND {
                warn!(%status, hash, "Gateway returned non-success status");
            }
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|e| {
            StorageError::NetworkError(format!("Failed to read body for {}: {}", hash, e))
        })?;

        Ok(Some(bytes.to_vec()))
    }
}
