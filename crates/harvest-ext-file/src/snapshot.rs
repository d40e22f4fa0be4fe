//! JSON snapshot collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use harvest_traits::*;

// =============================================================================
// SNAPSHOT DOCUMENT
// =============================================================================

/// On-disk layout of a snapshot.
///
/// ```json
/// {
///   "contracts": { "0xchef.totalAllocPoint()": "1000", "0xchef.rewarder(0)": "0xrew" },
///   "prices": { "sushi": 10.5 },
///   "pair_prices": { "0xlp": 250.0 },
///   "fee_aprs": { "0xlp": 3.2 },
///   "external_yields": { "yearn-usdc": 0.07 }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Contract reads keyed by `address.method(args)`
    #[serde(default)]
    pub contracts: HashMap<String, ContractValue>,
    /// USD prices by token symbol
    #[serde(default)]
    pub prices: HashMap<String, f64>,
    /// USD price per LP token by token address
    #[serde(default)]
    pub pair_prices: HashMap<String, f64>,
    /// Trailing fee yields (percent) by pool
    #[serde(default)]
    pub fee_aprs: HashMap<String, f64>,
    /// Reported yields (fraction) by key
    #[serde(default)]
    pub external_yields: HashMap<String, f64>,
}

/// Lowercases every `0x` token of a call key so lookups match [`ContractCall::key`].
fn normalize_call_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut token = String::new();
    let flush = |token: &mut String, out: &mut String| {
        if token.starts_with("0x") || token.starts_with("0X") {
            out.push_str(&token.to_ascii_lowercase());
        } else {
            out.push_str(token);
        }
        token.clear();
    };
    for c in key.chars() {
        if matches!(c, '.' | '(' | ')' | ',') {
            flush(&mut token, &mut out);
            out.push(c);
        } else if !c.is_whitespace() {
            token.push(c);
        }
    }
    flush(&mut token, &mut out);
    out
}

// =============================================================================
// SNAPSHOT COLLABORATORS
// =============================================================================

/// Point-in-time collaborator data, loaded from JSON and mutable in place.
///
/// Implements every collaborator trait, so one instance can back a whole
/// [`Collaborators`] bundle.
#[derive(Debug, Default)]
pub struct SnapshotCollaborators {
    file_path: Option<PathBuf>,
    contracts: DashMap<String, ContractValue>,
    prices: DashMap<TokenSymbol, f64>,
    pair_prices: DashMap<Address, f64>,
    fee_aprs: DashMap<PoolId, f64>,
    external_yields: DashMap<YieldKey, f64>,
}

impl SnapshotCollaborators {
    /// Create a snapshot backed by a JSON file.
    ///
    /// A missing file yields an empty snapshot.
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, TraitError> {
        let snapshot = Self {
            file_path: Some(file_path.as_ref().to_path_buf()),
            ..Default::default()
        };
        snapshot.reload()?;
        Ok(snapshot)
    }

    /// Create an empty in-memory snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, TraitError> {
        let document: SnapshotDocument =
            serde_json::from_str(content).map_err(|e| TraitError::ParseError(e.to_string()))?;
        let snapshot = Self::default();
        snapshot.load_document(document);
        Ok(snapshot)
    }

    /// Reload from the backing file, replacing all current data.
    pub fn reload(&self) -> Result<(), TraitError> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(()); // Empty source
        }

        let content = std::fs::read_to_string(path)?;
        let document: SnapshotDocument =
            serde_json::from_str(&content).map_err(|e| TraitError::ParseError(e.to_string()))?;
        self.clear();
        self.load_document(document);
        Ok(())
    }

    fn clear(&self) {
        self.contracts.clear();
        self.prices.clear();
        self.pair_prices.clear();
        self.fee_aprs.clear();
        self.external_yields.clear();
    }

    fn load_document(&self, document: SnapshotDocument) {
        for (key, value) in document.contracts {
            self.contracts.insert(normalize_call_key(&key), value);
        }
        for (symbol, price) in document.prices {
            self.prices.insert(TokenSymbol::new(symbol), price);
        }
        for (token, price) in document.pair_prices {
            self.pair_prices.insert(Address::new(token), price);
        }
        for (pool, apr) in document.fee_aprs {
            self.fee_aprs.insert(PoolId::new(pool), apr);
        }
        for (key, value) in document.external_yields {
            self.external_yields.insert(YieldKey::new(key), value);
        }
    }

    /// Set the result of a contract call.
    pub fn set_contract(&self, call: &ContractCall, value: ContractValue) {
        self.contracts.insert(call.key(), value);
    }

    /// Remove a contract call result.
    pub fn remove_contract(&self, call: &ContractCall) {
        self.contracts.remove(&call.key());
    }

    /// Set a token price.
    pub fn set_price(&self, symbol: impl Into<String>, price: f64) {
        self.prices.insert(TokenSymbol::new(symbol), price);
    }

    /// Remove a token price.
    pub fn remove_price(&self, symbol: &str) {
        self.prices.remove(&TokenSymbol::from(symbol));
    }

    /// Set an LP token price.
    pub fn set_pair_price(&self, token: impl AsRef<str>, price: f64) {
        self.pair_prices.insert(Address::new(token), price);
    }

    /// Set a pool's trailing fee yield (percent).
    pub fn set_fee_apr(&self, pool: impl Into<String>, apr: f64) {
        self.fee_aprs.insert(PoolId::new(pool), apr);
    }

    /// Set a reported yield (fraction).
    pub fn set_external_yield(&self, key: impl Into<String>, value: f64) {
        self.external_yields.insert(YieldKey::new(key), value);
    }

    /// Export the current contents.
    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            contracts: self
                .contracts
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            prices: self
                .prices
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
            pair_prices: self
                .pair_prices
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
            fee_aprs: self
                .fee_aprs
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
            external_yields: self
                .external_yields
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
        }
    }
}

#[async_trait]
impl ContractReader for SnapshotCollaborators {
    async fn read(&self, call: &ContractCall) -> Result<ContractValue, TraitError> {
        let key = call.key();
        self.contracts
            .get(&key)
            .map(|v| v.clone())
            .ok_or(TraitError::NotFound(key))
    }
}

#[async_trait]
impl PriceFeed for SnapshotCollaborators {
    async fn price(&self, symbol: &TokenSymbol) -> Result<Option<f64>, TraitError> {
        Ok(self.prices.get(symbol).map(|p| *p))
    }
}

#[async_trait]
impl PairPriceOracle for SnapshotCollaborators {
    async fn price_per_token(&self, token: &Address) -> Result<Option<f64>, TraitError> {
        Ok(self.pair_prices.get(token).map(|p| *p))
    }
}

#[async_trait]
impl HistoricalFeeSampler for SnapshotCollaborators {
    async fn fee_apr(&self, pool: &PoolId) -> Result<Option<f64>, TraitError> {
        Ok(self.fee_aprs.get(pool).map(|p| *p))
    }
}

#[async_trait]
impl ExternalYieldApi for SnapshotCollaborators {
    async fn reported_yield(&self, key: &YieldKey) -> Result<Option<f64>, TraitError> {
        Ok(self.external_yields.get(key).map(|p| *p))
    }
}
