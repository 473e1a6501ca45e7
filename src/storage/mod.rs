//! Storage backend abstraction
//!
//! Defines the capability traits the client talks to and their implementations:
//! - SimulatedBackend: in-memory stand-in for the remote service (default)
//! - HttpGateway: HTTP fetch-by-hash against a storage endpoint (`http-gateway` feature)
//!
//! A real backend can be substituted by implementing `StorageBackend` and
//! `StorageConnection`; the client's contract does not change.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageResult;

pub mod simulated;

#[cfg(feature = "http-gateway")]
pub mod gateway;

pub use simulated::SimulatedBackend;
#[cfg(feature = "http-gateway")]
pub use gateway::HttpGateway;

/// Prefix of every object hash handed out by the simulated service
pub const HASH_PREFIX: &str = "gf_";

/// Number of token characters following the prefix
pub const HASH_TOKEN_LEN: usize = 32;

/// Snapshot of an account as reported by the chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: String,
    /// Decimal string, never negative
    pub balance: String,
    pub sequence: u64,
    pub account_number: u64,
}

/// Factory for connection handles
///
/// Mirrors the chain SDK's client constructor, which only needs the RPC
/// endpoint and the chain id.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human-readable name of this backend
    fn name(&self) -> &str;

    /// Establish a connection handle
    async fn connect(
        &self,
        rpc_url: &str,
        chain_id: &str,
    ) -> StorageResult<Arc<dyn StorageConnection>>;
}

/// Remote primitives available on an established connection
#[async_trait]
pub trait StorageConnection: Send + Sync {
    /// Store `content` as `object_name` in `bucket`. Returns the backend-assigned hash.
    async fn put_object(
        &self,
        bucket: &str,
        object_name: &str,
        content: &[u8],
    ) -> StorageResult<String>;

    /// Fetch an object by hash. `Ok(None)` means not found.
    async fn get_object(&self, hash: &str) -> StorageResult<Option<Vec<u8>>>;

    /// List object identifiers (`bucket/object`) in a bucket, in order
    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>>;

    /// Create a bucket. Fails if it already exists.
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Balance of `address` as a decimal string
    async fn query_balance(&self, address: &str) -> StorageResult<String>;

    /// Account details of `address`
    async fn query_account(&self, address: &str) -> StorageResult<AccountSnapshot>;
}

/// Derive the object hash from an object name
///
/// A pure function of the name: the same name always maps to the same hash,
/// whatever the content.
pub fn object_hash(object_name: &str) -> String {
    let token = format!("{:x}", Sha256::digest(object_name.as_bytes()));
    format!("{}{}", HASH_PREFIX, &token[..HASH_TOKEN_LEN])
}
