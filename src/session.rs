//! Wallet-driven session controller
//!
//! Binds a `StorageClient` to the stream of identity signals coming from a
//! wallet. Every signal re-runs the lifecycle; the newest signal always wins,
//! and completions of older ones are discarded. Callers read the resulting
//! `SessionState` and use the gated wrappers, which refuse to run before the
//! session is initialized.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::client::{FALLBACK_BALANCE, StorageClient, UploadResult};
use crate::error::{StorageError, StorageResult};
use crate::identity::IdentitySignal;
use crate::storage::AccountSnapshot;

/// Error shown when the client cannot be initialized
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize Greenfield client";

/// Observable state of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    pub is_initialized: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Last known balance; kept across disconnects
    pub balance: String,
    /// Wallet address from the latest signal
    pub address: Option<String>,
    pub is_connected: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_initialized: false,
            is_loading: false,
            error: None,
            balance: FALLBACK_BALANCE.to_string(),
            address: None,
            is_connected: false,
        }
    }
}

struct SessionInner {
    client: Arc<StorageClient>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

/// Session controller for a storage client
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ClientSessionController {
    inner: Arc<SessionInner>,
}

/// Clears `is_loading` when an evaluation ends, on every path
struct LoadingGuard<'a> {
    controller: &'a ClientSessionController,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.controller
            .apply(self.generation, |state| state.is_loading = false);
    }
}

impl ClientSessionController {
    pub fn new(client: Arc<StorageClient>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(SessionInner {
                client,
                state,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn client(&self) -> &Arc<StorageClient> {
        &self.inner.client
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().is_initialized
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn balance(&self) -> String {
        self.inner.state.borrow().balance.clone()
    }

    fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Apply `update` if `generation` is still the newest signal
    fn apply(&self, generation: u64, update: impl FnOnce(&mut SessionState)) -> bool {
        self.inner.state.send_if_modified(|state| {
            if self.current_generation() != generation {
                return false;
            }
            update(state);
            true
        })
    }

    /// Start a new generation for `signal`, making older ones stale
    fn begin(&self, signal: &IdentitySignal) -> u64 {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.address = signal.address.clone();
            state.is_connected = signal.connected;
        });
        generation
    }

    /// Re-evaluate the lifecycle for one wallet signal
    pub async fn handle_identity(&self, signal: IdentitySignal) {
        let generation = self.begin(&signal);
        self.handle_identity_at(generation, signal).await;
    }

    /// Evaluate `signal`, already claimed as `generation` by `begin`
    async fn handle_identity_at(&self, generation: u64, signal: IdentitySignal) {
        let Some(address) = signal.active_address() else {
            debug!(generation, "Wallet disconnected, resetting session");
            self.apply(generation, |state| {
                state.is_initialized = false;
                state.is_loading = false;
                state.error = None;
            });
            return;
        };

        self.apply(generation, |state| {
            state.is_loading = true;
            state.error = None;
        });
        let _loading = LoadingGuard {
            controller: self,
            generation,
        };

        let outcome = self
            .inner
            .client
            .initialize_unless(address, || self.current_generation() != generation)
            .await;
        let initialized = match outcome {
            Some(initialized) if self.current_generation() == generation => initialized,
            _ => {
                debug!(generation, address, "Discarding stale initialization");
                return;
            }
        };

        if !initialized {
            self.apply(generation, |state| {
                state.is_initialized = false;
                state.error = Some(INIT_FAILED_MESSAGE.to_string());
            });
            return;
        }

        self.apply(generation, |state| state.is_initialized = true);
        info!(generation, address, "Session initialized");

        match self.inner.client.query_balance().await {
            Ok(balance) => {
                self.apply(generation, |state| state.balance = balance);
            }
            Err(e) => warn!(address, error = %e, "Failed to load balance"),
        }
    }

    /// Consume wallet signals until the sender is dropped
    ///
    /// Each signal is evaluated in its own task so a newer one can overtake
    /// an initialization still in flight. Generations are claimed here, in
    /// arrival order, so task scheduling cannot reorder signals. Returns once
    /// the stream has ended and every evaluation has finished.
    pub async fn run(&self, mut signals: mpsc::Receiver<IdentitySignal>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) => {
                        let generation = self.begin(&signal);
                        let controller = self.clone();
                        tasks.spawn(async move {
                            controller.handle_identity_at(generation, signal).await
                        });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Identity evaluation task failed");
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Identity evaluation task failed");
            }
        }
    }

    /// Run the signal loop on a background task
    pub fn spawn(&self, signals: mpsc::Receiver<IdentitySignal>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move { controller.run(signals).await })
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StorageError::WalletNotConnected)
        }
    }

    pub async fn upload_file(
        &self,
        content: &[u8],
        file_name: &str,
        object_name: Option<&str>,
    ) -> StorageResult<UploadResult> {
        self.ensure_initialized()?;
        self.inner
            .client
            .upload_file(content, file_name, object_name)
            .await
    }

    pub async fn download_file(&self, hash: &str) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_initialized()?;
        self.inner.client.download_file(hash).await
    }

    pub async fn list_objects(&self, bucket: Option<&str>) -> StorageResult<Vec<String>> {
        self.ensure_initialized()?;
        self.inner.client.list_objects(bucket).await
    }

    pub async fn create_bucket(&self, name: &str) -> StorageResult<bool> {
        self.ensure_initialized()?;
        self.inner.client.create_bucket(name).await
    }

    pub async fn get_account_info(&self) -> StorageResult<Option<AccountSnapshot>> {
        self.ensure_initialized()?;
        self.inner.client.get_account_info().await
    }

    /// Re-query the balance
    ///
    /// Does nothing before initialization. On failure the cached balance is
    /// kept.
    pub async fn refresh_balance(&self) {
        if !self.is_initialized() {
            return;
        }

        let generation = self.current_generation();
        match self.inner.client.query_balance().await {
            Ok(balance) => {
                self.apply(generation, |state| state.balance = balance);
            }
            Err(e) => error!(error = %e, "Failed to refresh balance"),
        }
    }
}
