//! Simulated storage backend
//!
//! Stands in for the remote storage service. Objects and buckets live in
//! memory for the lifetime of the backend, and every connection created by
//! the same backend sees the same data. Account queries return a fixed
//! balance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{AccountSnapshot, StorageBackend, StorageConnection, object_hash};
use crate::error::{StorageError, StorageResult};
#[cfg(feature = "http-gateway")]
use super::gateway::HttpGateway;

/// Balance reported for every account
pub const SIMULATED_BALANCE: &str = "0.1234";

#[derive(Debug, Default)]
struct SimulatedState {
    /// bucket -> object name -> hash
    buckets: BTreeMap<String, BTreeMap<String, String>>,
    /// hash -> content
    objects: HashMap<String, Vec<u8>>,
}

/// In-memory storage backend
#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<RwLock<SimulatedState>>,
    latency: Duration,
    balance: String,
    #[cfg(feature = "http-gateway")]
    gateway: Option<HttpGateway>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SimulatedState::default())),
            latency: Duration::ZERO,
            balance: SIMULATED_BALANCE.to_string(),
            #[cfg(feature = "http-gateway")]
            gateway: None,
        }
    }

    /// Delay every remote call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Report `balance` for every account
    pub fn with_balance(mut self, balance: impl Into<String>) -> Self {
        self.balance = balance.into();
        self
    }

    /// Serve downloads from an HTTP gateway instead of memory
    #[cfg(feature = "http-gateway")]
    pub fn with_gateway(mut self, gateway: HttpGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }
}

#[async_trait]
impl StorageBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "Simulated"
    }

    async fn connect(
        &self,
        rpc_url: &str,
        chain_id: &str,
    ) -> StorageResult<Arc<dyn StorageConnection>> {
        if rpc_url.is_empty() || chain_id.is_empty() {
            return Err(StorageError::ConnectionError(
                "RPC endpoint and chain id are required".to_string(),
            ));
        }

        debug!(rpc_url, chain_id, "Opening simulated connection");
        Ok(Arc::new(SimulatedConnection {
            backend: self.clone(),
        }))
    }
}

struct SimulatedConnection {
    backend: SimulatedBackend,
}

impl SimulatedConnection {
    async fn delay(&self) {
        if !self.backend.latency.is_zero() {
            tokio::time::sleep(self.backend.latency).await;
        }
    }

    fn read<T>(&self, f: impl FnOnce(&SimulatedState) -> T) -> StorageResult<T> {
        let state = self
            .backend
            .state
            .read()
            .map_err(|_| StorageError::BackendError("Simulated state poisoned".to_string()))?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut SimulatedState) -> T) -> StorageResult<T> {
        let mut state = self
            .backend
            .state
            .write()
            .map_err(|_| StorageError::BackendError("Simulated state poisoned".to_string()))?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl StorageConnection for SimulatedConnection {
    async fn put_object(
        &self,
        bucket: &str,
        object_name: &str,
        content: &[u8],
    ) -> StorageResult<String> {
        self.delay().await;

        let hash = object_hash(object_name);
        self.write(|state| {
            state
                .buckets
                .entry(bucket.to_string())
                .or_default()
                .insert(object_name.to_string(), hash.clone());
            state.objects.insert(hash.clone(), content.to_vec());
        })?;

        debug!(bucket, object_name, %hash, size = content.len(), "Stored object");
        Ok(hash)
    }

    async fn get_object(&self, hash: &str) -> StorageResult<Option<Vec<u8>>> {
        #[cfg(feature = "http-gateway")]
        {
            if let Some(gateway) = &self.backend.gateway {
                return gateway.fetch(hash).await;
            }
        }

        self.delay().await;
        self.read(|state| state.objects.get(hash).cloned())
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>> {
        self.delay().await;

        let objects = self.read(|state| {
            state.buckets.get(bucket).map(|objects| {
                objects
                    .keys()
                    .map(|name| format!("{}/{}", bucket, name))
                    .collect::<Vec<_>>()
            })
        })?;

        objects.ok_or_else(|| StorageError::NotFound(format!("bucket {}", bucket)))
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.delay().await;

        let created = self.write(|state| {
            if state.buckets.contains_key(bucket) {
                false
            } else {
                state.buckets.insert(bucket.to_string(), BTreeMap::new());
                true
            }
        })?;

        if created {
            Ok(())
        } else {
            Err(StorageError::BackendError(format!(
                "Bucket already exists: {}",
                bucket
            )))
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        self.delay().await;
        self.read(|state| state.buckets.contains_key(bucket))
    }

    async fn query_balance(&self, _address: &str) -> StorageResult<String> {
        self.delay().await;
        Ok(self.backend.balance.clone())
    }

    async fn query_account(&self, address: &str) -> StorageResult<AccountSnapshot> {
        self.delay().await;
        Ok(AccountSnapshot {
            address: address.to_string(),
            balance: self.backend.balance.clone(),
            sequence: 0,
            account_number: 0,
        })
    }
}
