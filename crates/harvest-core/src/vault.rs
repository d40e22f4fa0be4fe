//! Vault identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable vault identifier (the vault's listed name).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultId(pub String);

impl VaultId {
    /// Create a new vault ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VaultId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VaultId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A yield-bearing vault as listed for one refresh cycle.
///
/// The vault set is supplied by the caller and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Stable identifier
    pub name: VaultId,
    /// Address of the token the vault accepts
    pub deposit_token: String,
    /// Address of the backing strategy contract, if any
    #[serde(default)]
    pub strategy: Option<String>,
}

impl Vault {
    /// Create a vault without a strategy.
    pub fn new(name: impl Into<VaultId>, deposit_token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deposit_token: deposit_token.into(),
            strategy: None,
        }
    }

    /// Set the strategy address.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }
}
