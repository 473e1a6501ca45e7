//! Greenfield Client SDK - wallet-gated access to object storage
//!
//! Provides:
//! - A storage client with an explicit connection lifecycle
//! - Bucket/object operations and balance/account queries that refuse to run
//!   before initialization
//! - A session controller that follows a wallet's connection signals
//! - Pluggable storage backends (simulated in-memory service, HTTP download gateway)

pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use client::{ConnectionState, StorageClient, UploadResult};
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use identity::{Identity, IdentitySignal};
pub use session::{ClientSessionController, INIT_FAILED_MESSAGE, SessionState};
#[cfg(feature = "http-gateway")]
pub use storage::HttpGateway;
pub use storage::{AccountSnapshot, SimulatedBackend, StorageBackend, StorageConnection};
