//! Storage client
//!
//! Owns the configuration, the connection lifecycle and every remote
//! operation. No remote operation reaches the backend unless `initialize`
//! has succeeded; otherwise it fails with `StorageError::NotInitialized`.
//!
//! The `Err` side of each operation is reserved for that guard. Operation
//! outcomes travel in the `Ok` payload: `initialize` and `upload_file` report
//! failure explicitly, the read/query paths log it and return a default.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::identity::Identity;
use crate::storage::{AccountSnapshot, StorageBackend, StorageConnection};

/// Balance reported when the balance query fails
pub const FALLBACK_BALANCE: &str = "0";

/// Last timestamp handed out for a generated object name
static LAST_OBJECT_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Lifecycle state of a storage client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Outcome of an upload
///
/// Either `hash` and `url` are set, or `error` is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    pub fn succeeded(hash: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            success: true,
            hash: Some(hash.into()),
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            hash: None,
            url: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Default)]
struct ClientInner {
    state: ConnectionState,
    identity: Option<Identity>,
    connection: Option<Arc<dyn StorageConnection>>,
    last_error: Option<String>,
}

/// Client for the remote storage service
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use greenfield_client_sdk::{ConnectionState, SimulatedBackend, StorageClient, StorageConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = StorageClient::new(StorageConfig::default(), Arc::new(SimulatedBackend::new()));
/// assert!(client.initialize("0xABC").await);
/// assert_eq!(client.state(), ConnectionState::Ready);
///
/// let result = client.upload_file(b"png bytes", "photo.png", None).await.unwrap();
/// assert!(result.success);
/// # }
/// ```
pub struct StorageClient {
    config: StorageConfig,
    backend: Arc<dyn StorageBackend>,
    inner: RwLock<ClientInner>,
    init_lock: tokio::sync::Mutex<()>,
}

/// Marks an initialization as failed if it is dropped before finishing
struct InitGuard<'a> {
    client: &'a StorageClient,
    armed: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Initialization abandoned before completion");
            let mut inner = self.client.write_inner();
            inner.state = ConnectionState::Failed;
            inner.identity = None;
            inner.connection = None;
            inner.last_error = Some("Initialization cancelled".to_string());
        }
    }
}

impl StorageClient {
    /// Create a client. No connection is made until `initialize`.
    ///
    /// The configuration is taken as is; use [`StorageClient::try_new`] for
    /// configuration that was not already validated (a zero timeout makes
    /// every remote call time out).
    pub fn new(config: StorageConfig, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            config,
            backend,
            inner: RwLock::new(ClientInner::default()),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a client after validating `config`
    pub fn try_new(
        config: StorageConfig,
        backend: Arc<dyn StorageBackend>,
    ) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self::new(config, backend))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.read_inner().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Identity of the last successful or in-flight initialization
    pub fn identity(&self) -> Option<Identity> {
        self.read_inner().identity.clone()
    }

    /// Error recorded by the last failed initialization
    pub fn last_error(&self) -> Option<String> {
        self.read_inner().last_error.clone()
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, ClientInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, ClientInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect on behalf of `address`
    ///
    /// Always ends in `Ready` (returns true) or `Failed` (returns false, error
    /// available from `last_error`). Each call starts from scratch; nothing
    /// from a previous identity is kept. Calls are serialized.
    pub async fn initialize(&self, address: &str) -> bool {
        let _serial = self.init_lock.lock().await;
        self.initialize_locked(address).await
    }

    /// Like `initialize`, unless the call is superseded while queued
    ///
    /// `superseded` is checked once this call holds the initialization lock.
    /// If it returns true nothing is changed and `None` is returned, so a
    /// queued request for an older identity cannot overwrite a newer one.
    pub async fn initialize_unless(
        &self,
        address: &str,
        superseded: impl FnOnce() -> bool,
    ) -> Option<bool> {
        let _serial = self.init_lock.lock().await;
        if superseded() {
            debug!(address, "Skipping superseded initialization");
            return None;
        }
        Some(self.initialize_locked(address).await)
    }

    /// Body of `initialize`; the caller holds `init_lock`
    async fn initialize_locked(&self, address: &str) -> bool {
        let identity = Identity::parse(address);
        {
            let mut inner = self.write_inner();
            inner.state = ConnectionState::Initializing;
            inner.identity = identity.as_ref().ok().cloned();
            inner.connection = None;
            inner.last_error = None;
        }
        let mut guard = InitGuard {
            client: self,
            armed: true,
        };

        let result = match identity {
            Ok(identity) => self
                .with_timeout(
                    self.backend
                        .connect(&self.config.rpc_url, &self.config.chain_id),
                )
                .await
                .map(|connection| (identity, connection)),
            Err(e) => Err(e),
        };
        guard.armed = false;

        let mut inner = self.write_inner();
        match result {
            Ok((identity, connection)) => {
                info!(
                    address = identity.address(),
                    backend = self.backend.name(),
                    "Greenfield client initialized"
                );
                inner.state = ConnectionState::Ready;
                inner.identity = Some(identity);
                inner.connection = Some(connection);
                true
            }
            Err(e) => {
                error!(address, error = %e, "Failed to initialize Greenfield client");
                inner.state = ConnectionState::Failed;
                inner.identity = None;
                inner.connection = None;
                inner.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// The live connection and identity, or `NotInitialized`
    fn ready(&self) -> StorageResult<(Arc<dyn StorageConnection>, Identity)> {
        let inner = self.read_inner();
        match (&inner.state, &inner.connection, &inner.identity) {
            (ConnectionState::Ready, Some(connection), Some(identity)) => {
                Ok((Arc::clone(connection), identity.clone()))
            }
            _ => Err(StorageError::NotInitialized),
        }
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        let seconds = self.config.timeout_seconds;
        tokio::time::timeout(Duration::from_secs(seconds), call)
            .await
            .map_err(|_| StorageError::Timeout(seconds))?
    }

    /// Object name for an upload without an explicit name
    ///
    /// Timestamps are strictly increasing across the process, so two uploads
    /// of the same file never share a name.
    pub fn generate_object_name(file_name: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = LAST_OBJECT_TIMESTAMP
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        format!("{}-{}", now.max(previous + 1), file_name)
    }

    /// Upload `content` to the default bucket
    ///
    /// Uses `object_name` when given, otherwise a generated
    /// `{timestamp}-{file_name}`. Transport failures come back as an
    /// unsuccessful `UploadResult`.
    pub async fn upload_file(
        &self,
        content: &[u8],
        file_name: &str,
        object_name: Option<&str>,
    ) -> StorageResult<UploadResult> {
        let (connection, _) = self.ready()?;

        let object_name = match object_name.filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => Self::generate_object_name(file_name),
        };
        let bucket = self.config.bucket_name.as_str();

        match self
            .with_timeout(connection.put_object(bucket, &object_name, content))
            .await
        {
            Ok(hash) => {
                info!(bucket, %object_name, %hash, size = content.len(), "Uploaded object");
                Ok(UploadResult::succeeded(
                    hash,
                    self.config.object_url(bucket, &object_name),
                ))
            }
            Err(e) => {
                error!(bucket, %object_name, error = %e, "Greenfield upload failed");
                Ok(UploadResult::failed(e.to_string()))
            }
        }
    }

    /// Download an object by hash
    ///
    /// Not-found and transport failures both yield `None`; the difference is
    /// only visible in the logs.
    pub async fn download_file(&self, hash: &str) -> StorageResult<Option<Vec<u8>>> {
        let (connection, _) = self.ready()?;

        match self.with_timeout(connection.get_object(hash)).await {
            Ok(Some(content)) => Ok(Some(content)),
            Ok(None) => {
                debug!(hash, "Object not found");
                Ok(None)
            }
            Err(e) => {
                error!(hash, error = %e, "Greenfield download failed");
                Ok(None)
            }
        }
    }

    /// List objects in `bucket`, or in the default bucket
    ///
    /// Returns an empty list on failure.
    pub async fn list_objects(&self, bucket: Option<&str>) -> StorageResult<Vec<String>> {
        let (connection, _) = self.ready()?;
        let bucket = bucket.unwrap_or(&self.config.bucket_name);

        match self.with_timeout(connection.list_objects(bucket)).await {
            Ok(objects) => Ok(objects),
            Err(e) => {
                error!(bucket, error = %e, "List objects failed");
                Ok(Vec::new())
            }
        }
    }

    /// Create a bucket. `false` on any failure, including "already exists".
    pub async fn create_bucket(&self, name: &str) -> StorageResult<bool> {
        let (connection, _) = self.ready()?;

        info!(bucket = name, "Creating bucket");
        match self.with_timeout(connection.create_bucket(name)).await {
            Ok(()) => Ok(true),
            Err(e) => {
                error!(bucket = name, error = %e, "Bucket creation failed");
                Ok(false)
            }
        }
    }

    /// Make sure the default bucket exists, creating it if needed
    pub async fn ensure_bucket_exists(&self) -> StorageResult<bool> {
        let (connection, _) = self.ready()?;
        let bucket = self.config.bucket_name.as_str();

        debug!(bucket, "Ensuring bucket exists");
        let outcome = match self.with_timeout(connection.bucket_exists(bucket)).await {
            Ok(true) => Ok(()),
            Ok(false) => self.with_timeout(connection.create_bucket(bucket)).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => Ok(true),
            Err(e) => {
                error!(bucket, error = %e, "Bucket check/creation failed");
                Ok(false)
            }
        }
    }

    /// Balance of the connected account, `"0"` on failure
    pub async fn get_balance(&self) -> StorageResult<String> {
        match self.query_balance().await {
            Ok(balance) => Ok(balance),
            Err(e) if e.is_not_initialized() => Err(e),
            Err(e) => {
                error!(error = %e, "Get balance failed");
                Ok(FALLBACK_BALANCE.to_string())
            }
        }
    }

    /// Balance of the connected account, propagating any failure
    pub async fn query_balance(&self) -> StorageResult<String> {
        let (connection, identity) = self.ready()?;

        let balance = self
            .with_timeout(connection.query_balance(identity.address()))
            .await?;
        validate_balance(&balance)?;
        Ok(balance)
    }

    /// Account details of the connected account, `None` on failure
    pub async fn get_account_info(&self) -> StorageResult<Option<AccountSnapshot>> {
        let (connection, identity) = self.ready()?;

        let result = self
            .with_timeout(connection.query_account(identity.address()))
            .await
            .and_then(|account| {
                validate_balance(&account.balance)?;
                Ok(account)
            });

        match result {
            Ok(account) => Ok(Some(account)),
            Err(e) => {
                error!(address = identity.address(), error = %e, "Get account info failed");
                Ok(None)
            }
        }
    }
}

/// A balance must be a non-negative decimal string
fn validate_balance(balance: &str) -> StorageResult<()> {
    let mut parts = balance.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let valid = !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.is_none_or(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()));

    if valid {
        Ok(())
    } else {
        Err(StorageError::SerializationError(format!(
            "Invalid balance: {}",
            balance
        )))
    }
}
