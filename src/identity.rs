//! Wallet identity types
//!
//! The wallet collaborator owns the account; this crate only sees its address
//! and whether it is connected.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Maximum accepted address length
const MAX_ADDRESS_LENGTH: usize = 128;

/// Account address used to scope storage operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    address: String,
}

impl Identity {
    /// Validate an address and wrap it as an identity
    ///
    /// Addresses are opaque, so only the shape is checked: non-empty, no
    /// whitespace or control characters, bounded length.
    pub fn parse(address: impl Into<String>) -> Result<Self, StorageError> {
        let address = address.into();

        if address.is_empty() {
            return Err(StorageError::InvalidIdentity(
                "Address cannot be empty".to_string(),
            ));
        }

        if address.len() > MAX_ADDRESS_LENGTH {
            return Err(StorageError::InvalidIdentity(format!(
                "Address too long (max {} characters)",
                MAX_ADDRESS_LENGTH
            )));
        }

        if address
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(StorageError::InvalidIdentity(
                "Address contains whitespace or control characters".to_string(),
            ));
        }

        Ok(Self { address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

/// One delivery from the wallet collaborator
///
/// Deliveries may repeat; each one is re-evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentitySignal {
    pub connected: bool,
    pub address: Option<String>,
}

impl IdentitySignal {
    /// A connected wallet with the given address
    pub fn connected(address: impl Into<String>) -> Self {
        Self {
            connected: true,
            address: Some(address.into()),
        }
    }

    /// No wallet connected
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// The address to initialize with, if the signal carries a usable one
    pub fn active_address(&self) -> Option<&str> {
        if !self.connected {
            return None;
        }
        self.address.as_deref().filter(|a| !a.is_empty())
    }
}
