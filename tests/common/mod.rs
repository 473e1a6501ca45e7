//! Shared test backend

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use greenfield_client_sdk::storage::{
    AccountSnapshot, StorageBackend, StorageConnection, object_hash,
};
use greenfield_client_sdk::{StorageClient, StorageConfig, StorageError, StorageResult};

/// Number of calls that reached the backend, per primitive
#[derive(Debug, Default)]
pub struct CallCounts {
    pub connect: AtomicUsize,
    pub put: AtomicUsize,
    pub get: AtomicUsize,
    pub list: AtomicUsize,
    pub create: AtomicUsize,
    pub exists: AtomicUsize,
    pub balance: AtomicUsize,
    pub account: AtomicUsize,
}

impl CallCounts {
    pub fn remote_calls(&self) -> usize {
        [
            &self.put,
            &self.get,
            &self.list,
            &self.create,
            &self.exists,
            &self.balance,
            &self.account,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// Backend whose behaviour is scripted by the test
#[derive(Default)]
pub struct ScriptedBackend {
    pub calls: Arc<CallCounts>,
    pub fail_connect: AtomicBool,
    /// Every primitive on an established connection fails
    pub fail_operations: Arc<AtomicBool>,
    pub fail_balance: Arc<AtomicBool>,
    pub balance: Arc<Mutex<String>>,
    /// Delays applied to successive `connect` calls
    pub connect_delays: Mutex<VecDeque<Duration>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.balance.lock().unwrap() = "0.1234".to_string();
        Arc::new(backend)
    }

    pub fn refusing() -> Arc<Self> {
        let backend = Self::new();
        backend.fail_connect.store(true, Ordering::SeqCst);
        backend
    }

    pub fn set_balance(&self, balance: &str) {
        *self.balance.lock().unwrap() = balance.to_string();
    }

    pub fn delay_next_connect(&self, delay: Duration) {
        self.connect_delays.lock().unwrap().push_back(delay);
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn connect(
        &self,
        _rpc_url: &str,
        _chain_id: &str,
    ) -> StorageResult<Arc<dyn StorageConnection>> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);

        let delay = self.connect_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionError("scripted refusal".to_string()));
        }

        Ok(Arc::new(ScriptedConnection {
            calls: Arc::clone(&self.calls),
            fail_operations: Arc::clone(&self.fail_operations),
            fail_balance: Arc::clone(&self.fail_balance),
            balance: Arc::clone(&self.balance),
        }))
    }
}

struct ScriptedConnection {
    calls: Arc<CallCounts>,
    fail_operations: Arc<AtomicBool>,
    fail_balance: Arc<AtomicBool>,
    balance: Arc<Mutex<String>>,
}

impl ScriptedConnection {
    fn check(&self, counter: &AtomicUsize) -> StorageResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_operations.load(Ordering::SeqCst) {
            Err(StorageError::NetworkError("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageConnection for ScriptedConnection {
    async fn put_object(
        &self,
        _bucket: &str,
        object_name: &str,
        _content: &[u8],
    ) -> StorageResult<String> {
        self.check(&self.calls.put)?;
        Ok(object_hash(object_name))
    }

    async fn get_object(&self, _hash: &str) -> StorageResult<Option<Vec<u8>>> {
        self.check(&self.calls.get)?;
        Ok(None)
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>> {
        self.check(&self.calls.list)?;
        Ok(vec![
            format!("{}/example1.jpg", bucket),
            format!("{}/example2.png", bucket),
        ])
    }

    async fn create_bucket(&self, _bucket: &str) -> StorageResult<()> {
        self.check(&self.calls.create)
    }

    async fn bucket_exists(&self, _bucket: &str) -> StorageResult<bool> {
        self.check(&self.calls.exists)?;
        Ok(false)
    }

    async fn query_balance(&self, _address: &str) -> StorageResult<String> {
        self.check(&self.calls.balance)?;
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(StorageError::NetworkError("balance unavailable".to_string()));
        }
        Ok(self.balance.lock().unwrap().clone())
    }

    async fn query_account(&self, address: &str) -> StorageResult<AccountSnapshot> {
        self.check(&self.calls.account)?;
        Ok(AccountSnapshot {
            address: address.to_string(),
            balance: self.balance.lock().unwrap().clone(),
            sequence: 0,
            account_number: 0,
        })
    }
}

pub fn test_config() -> StorageConfig {
    StorageConfig::default()
        .with_endpoint("https://sp.test")
        .with_bucket("assets")
        .with_timeout(5)
}

pub fn client_with(backend: &Arc<ScriptedBackend>) -> StorageClient {
    StorageClient::new(test_config(), Arc::clone(backend) as Arc<dyn StorageBackend>)
}
