//! Reward source catalog and vault routes.
//!
//! A [`RoutingConfig`] has two halves:
//!
//! - `sources`: every reward source the engine may compute, keyed by
//!   [`SourceId`], with a `kind` tag selecting the computation and its inputs.
//! - `vaults`: for each vault, the ordered list of route items (source
//!   references and auxiliary fee samples) and an optional total override.
//!
//! ```toml
//! [[sources]]
//! id = "sushi-eth-alcx"
//! kind = "master_chef"
//! label = "sushi"
//! chef = "0xc2edad668740f1aa35e4d8f227fb8e17dca888cd"
//! pool_id = 0
//! lp_token = "0xc3f279090a47e80990fe3a9c30d24cb117ef91a8"
//! reward_token = "sushi"
//!
//! [[vaults]]
//! vault = "pSLP ETH/ALCX"
//! items = [
//!     { source = "sushi-eth-alcx" },
//!     { fee_pool = "0xc3f279090a47e80990fe3a9c30d24cb117ef91a8" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use harvest_core::{VaultId, LP_LABEL};
use harvest_traits::{Address, PoolId, SourceId, TokenSymbol, YieldKey};

use crate::error::{read_config_file, ConfigResult, Validate, ValidationError};

// =============================================================================
// SOURCES
// =============================================================================

/// How a reward rate is expressed on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBasis {
    /// Tokens per block
    #[default]
    PerBlock,
    /// Tokens per second
    PerSecond,
}

/// One entry of the reward source catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Unique source identifier.
    pub id: SourceId,

    /// Display label of the contribution (e.g. `sushi`).
    pub label: String,

    /// Fraction retained after performance fees. Falls back to the engine
    /// default for emission sources and to 1.0 for pass-through sources.
    #[serde(default)]
    pub fee_discount: Option<f64>,

    /// Computation and its inputs.
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Reward computation selected by the `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Synthetix-style staking rewards (`rewardRate` per second).
    StakingRewards {
        /// Staking rewards contract.
        contract: Address,
        /// Price symbol of the reward token.
        reward_token: TokenSymbol,
        /// Method returning the staked token address.
        #[serde(default = "default_staking_token_method")]
        staking_token_method: String,
        /// Price the staked token by symbol instead of the pair oracle.
        #[serde(default)]
        staked_symbol: Option<TokenSymbol>,
    },

    /// Staking rewards read through `getRewardForDuration`.
    RewardsForDuration {
        /// Staking rewards contract.
        contract: Address,
        /// Price symbol of the reward token.
        reward_token: TokenSymbol,
        /// Price the staked token by symbol instead of the pair oracle.
        #[serde(default)]
        staked_symbol: Option<TokenSymbol>,
        /// Emissions have ended; the source reports zero.
        #[serde(default)]
        retired: bool,
    },

    /// MasterChef pool: per-block emission split by allocation points.
    MasterChef {
        /// MasterChef contract.
        chef: Address,
        /// Pool index.
        pool_id: u64,
        /// LP token staked in the pool.
        lp_token: Address,
        /// Price symbol of the reward token.
        reward_token: TokenSymbol,
        /// Method returning the per-block emission.
        #[serde(default = "default_per_block_method")]
        per_block_method: String,
        /// Share of the per-block emission paid to pools.
        #[serde(default = "default_emission_share")]
        emission_share: f64,
        /// Price the LP token by symbol instead of the pair oracle.
        #[serde(default)]
        staked_symbol: Option<TokenSymbol>,
    },

    /// Secondary rewarder attached to a MasterChef pool.
    Rewarder {
        /// MasterChef contract owning the rewarder.
        chef: Address,
        /// Pool index.
        pool_id: u64,
        /// LP token staked in the pool.
        lp_token: Address,
        /// Price symbol of the reward token.
        reward_token: TokenSymbol,
        /// Whether the rewarder emits per block or per second.
        #[serde(default)]
        rate: RateBasis,
        /// Price the LP token by symbol instead of the pair oracle.
        #[serde(default)]
        staked_symbol: Option<TokenSymbol>,
    },

    /// Staking pools contract with weighted per-block rewards.
    WeightedPool {
        /// Staking pools contract.
        pools: Address,
        /// Pool index.
        pool_id: u64,
        /// Token staked in the pool.
        staked_token: Address,
        /// Price symbol of the reward token.
        reward_token: TokenSymbol,
        /// Price the staked token by symbol instead of the pair oracle.
        #[serde(default)]
        staked_symbol: Option<TokenSymbol>,
    },

    /// Emission APR reported off-chain, then discounted and compounded.
    ExternalEmission {
        /// Yield report key.
        key: YieldKey,
    },

    /// Yield reported by an external aggregator, passed through as-is.
    PassThrough {
        /// Yield report key.
        key: YieldKey,
    },

    /// Daily reinvestment of one source's yield into another's position.
    Reinvestment {
        /// Source whose yield is swept daily.
        feed: SourceId,
        /// Label read from the feed contribution (defaults to its first label).
        #[serde(default)]
        feed_label: Option<String>,
        /// Source whose post-fee APR the swept position earns.
        reinvest: SourceId,
        /// Simulated days.
        #[serde(default = "default_reinvestment_days")]
        days: u32,
    },
}

fn default_staking_token_method() -> String {
    "stakingToken".to_string()
}

fn default_per_block_method() -> String {
    "sushiPerBlock".to_string()
}

fn default_emission_share() -> f64 {
    0.9
}

fn default_reinvestment_days() -> u32 {
    364
}

impl SourceKind {
    /// Short name of the kind, as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::StakingRewards { .. } => "staking_rewards",
            SourceKind::RewardsForDuration { .. } => "rewards_for_duration",
            SourceKind::MasterChef { .. } => "master_chef",
            SourceKind::Rewarder { .. } => "rewarder",
            SourceKind::WeightedPool { .. } => "weighted_pool",
            SourceKind::ExternalEmission { .. } => "external_emission",
            SourceKind::PassThrough { .. } => "pass_through",
            SourceKind::Reinvestment { .. } => "reinvestment",
        }
    }

    /// Returns true when the computed value is already a final yield and
    /// must never be compounded again.
    pub fn is_final_yield(&self) -> bool {
        matches!(
            self,
            SourceKind::PassThrough { .. } | SourceKind::Reinvestment { .. }
        )
    }
}

impl SourceSpec {
    /// Sources whose results this source reads.
    pub fn dependencies(&self) -> Vec<&SourceId> {
        match &self.kind {
            SourceKind::Reinvestment { feed, reinvest, .. } => vec![feed, reinvest],
            _ => Vec::new(),
        }
    }

    /// Price symbols this source needs in the per-cycle price table.
    pub fn price_symbols(&self) -> Vec<&TokenSymbol> {
        match &self.kind {
            SourceKind::StakingRewards {
                reward_token,
                staked_symbol,
                ..
            }
            | SourceKind::RewardsForDuration {
                reward_token,
                staked_symbol,
                ..
            }
            | SourceKind::MasterChef {
                reward_token,
                staked_symbol,
                ..
            }
            | SourceKind::Rewarder {
                reward_token,
                staked_symbol,
                ..
            }
            | SourceKind::WeightedPool {
                reward_token,
                staked_symbol,
                ..
            } => std::iter::once(reward_token)
                .chain(staked_symbol.as_ref())
                .collect(),
            SourceKind::ExternalEmission { .. }
            | SourceKind::PassThrough { .. }
            | SourceKind::Reinvestment { .. } => Vec::new(),
        }
    }

    fn validate_into(&self, field: &str, errors: &mut Vec<ValidationError>) {
        if self.id.as_str().is_empty() {
            errors.push(ValidationError::new(format!("{field}.id"), "Source id cannot be empty"));
        }
        if self.label.is_empty() {
            errors.push(ValidationError::new(
                format!("{field}.label"),
                "Label cannot be empty",
            ));
        }
        if self.label == "apr" {
            errors.push(ValidationError::with_rule(
                format!("{field}.label"),
                "`apr` is reserved",
                "reserved_label",
            ));
        }
        if let Some(discount) = self.fee_discount {
            if !(0.0..=1.0).contains(&discount) {
                errors.push(ValidationError::with_rule(
                    format!("{field}.fee_discount"),
                    format!("Fee discount {discount} must be between 0 and 1"),
                    "unit_interval",
                ));
            }
        }

        match &self.kind {
            SourceKind::StakingRewards {
                staking_token_method,
                ..
            } if staking_token_method.is_empty() => {
                errors.push(ValidationError::new(
                    format!("{field}.staking_token_method"),
                    "Method name cannot be empty",
                ));
            }
            SourceKind::MasterChef {
                per_block_method,
                emission_share,
                ..
            } => {
                if per_block_method.is_empty() {
                    errors.push(ValidationError::new(
                        format!("{field}.per_block_method"),
                        "Method name cannot be empty",
                    ));
                }
                if !(*emission_share > 0.0 && *emission_share <= 1.0) {
                    errors.push(ValidationError::with_rule(
                        format!("{field}.emission_share"),
                        format!("Emission share {emission_share} must be in (0, 1]"),
                        "unit_interval",
                    ));
                }
            }
            SourceKind::Reinvestment {
                feed,
                reinvest,
                days,
                ..
            } => {
                if *days == 0 {
                    errors.push(ValidationError::with_rule(
                        format!("{field}.days"),
                        "Reinvestment must simulate at least one day",
                        "min_days",
                    ));
                }
                if feed == &self.id || reinvest == &self.id {
                    errors.push(ValidationError::with_rule(
                        format!("{field}.kind"),
                        format!("Source {} depends on itself", self.id),
                        "acyclic",
                    ));
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// ROUTES
// =============================================================================

/// One element of a vault route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteItem {
    /// Contribution of a catalog source.
    Reward {
        /// Referenced source.
        source: SourceId,
    },
    /// Trailing trading-fee yield of a pool, added without compounding.
    Auxiliary {
        /// Pool sampled by the fee sampler.
        fee_pool: PoolId,
        /// Contribution label; only `lp` is accepted, as fee yield is
        /// additive and never compounded.
        #[serde(default = "default_fee_label")]
        label: String,
    },
}

fn default_fee_label() -> String {
    LP_LABEL.to_string()
}

impl RouteItem {
    /// Source reference, if this is a reward item.
    pub fn source(&self) -> Option<&SourceId> {
        match self {
            RouteItem::Reward { source } => Some(source),
            RouteItem::Auxiliary { .. } => None,
        }
    }
}

/// Replaces the compounded total of a vault with one upstream value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TotalOverride {
    /// The `apr` carried by the source's contribution.
    AprOf {
        /// Source providing the value.
        source: SourceId,
    },
    /// The source's value under `label`.
    LabelOf {
        /// Source providing the value.
        source: SourceId,
        /// Label to read.
        label: String,
    },
}

impl TotalOverride {
    /// Source the override reads.
    pub fn source(&self) -> &SourceId {
        match self {
            TotalOverride::AprOf { source } | TotalOverride::LabelOf { source, .. } => source,
        }
    }
}

/// Route of one vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRoute {
    /// Vault identity.
    pub vault: VaultId,

    /// Route items in display order.
    #[serde(default)]
    pub items: Vec<RouteItem>,

    /// Optional total override.
    #[serde(default)]
    pub total_override: Option<TotalOverride>,
}

// =============================================================================
// ROUTING CONFIG
// =============================================================================

/// Source catalog plus vault routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Reward source catalog.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,

    /// Vault routes.
    #[serde(default)]
    pub vaults: Vec<VaultRoute>,
}

impl RoutingConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse from JSON text.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = read_config_file(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Load from a file and validate.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let config = Self::from_file(path)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Look up a catalog source.
    pub fn source(&self, id: &SourceId) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| &s.id == id)
    }

    /// Look up a vault route.
    pub fn route(&self, vault: &VaultId) -> Option<&VaultRoute> {
        self.vaults.iter().find(|r| &r.vault == vault)
    }

    /// Ids of sources taking part in a dependency cycle.
    fn cyclic_sources(&self) -> Vec<SourceId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            id: &'a SourceId,
            by_id: &HashMap<&'a SourceId, &'a SourceSpec>,
            marks: &mut HashMap<&'a SourceId, Mark>,
            cyclic: &mut Vec<SourceId>,
        ) {
            match marks.get(id) {
                Some(Mark::Done) => return,
                Some(Mark::Visiting) => {
                    if !cyclic.contains(id) {
                        cyclic.push(id.clone());
                    }
                    return;
                }
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            if let Some(spec) = by_id.get(id) {
                for dep in spec.dependencies() {
                    visit(dep, by_id, marks, cyclic);
                }
            }
            marks.insert(id, Mark::Done);
        }

        let by_id: HashMap<&SourceId, &SourceSpec> =
            self.sources.iter().map(|s| (&s.id, s)).collect();
        let mut marks = HashMap::new();
        let mut cyclic = Vec::new();
        for spec in &self.sources {
            visit(&spec.id, &by_id, &mut marks, &mut cyclic);
        }
        cyclic
    }
}

impl Validate for RoutingConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // catalog
        let mut seen_sources = HashSet::new();
        for (i, spec) in self.sources.iter().enumerate() {
            let field = format!("sources[{i}]");
            spec.validate_into(&field, &mut errors);
            if !seen_sources.insert(&spec.id) {
                errors.push(ValidationError::with_rule(
                    format!("{field}.id"),
                    format!("Duplicate source id {}", spec.id),
                    "unique_source",
                ));
            }
            for dep in spec.dependencies() {
                if self.source(dep).is_none() {
                    errors.push(ValidationError::with_rule(
                        format!("{field}.kind"),
                        format!("Unknown dependency {dep}"),
                        "known_source",
                    ));
                }
            }
        }

        for id in self.cyclic_sources() {
            errors.push(ValidationError::with_rule(
                "sources",
                format!("Source {id} is part of a dependency cycle"),
                "acyclic",
            ));
        }

        // routes
        let mut seen_vaults = HashSet::new();
        for (i, route) in self.vaults.iter().enumerate() {
            let field = format!("vaults[{i}]");
            if route.vault.as_str().is_empty() {
                errors.push(ValidationError::new(
                    format!("{field}.vault"),
                    "Vault name cannot be empty",
                ));
            }
            if !seen_vaults.insert(&route.vault) {
                errors.push(ValidationError::with_rule(
                    format!("{field}.vault"),
                    format!("Duplicate vault {}", route.vault),
                    "unique_vault",
                ));
            }

            let mut labels = HashSet::new();
            for (j, item) in route.items.iter().enumerate() {
                let item_field = format!("{field}.items[{j}]");
                let label = match item {
                    RouteItem::Reward { source } => match self.source(source) {
                        Some(spec) => {
                            let overridden_by = route.total_override.as_ref().map(|o| o.source());
                            if spec.kind.is_final_yield() && overridden_by != Some(source) {
                                errors.push(ValidationError::with_rule(
                                    item_field.clone(),
                                    format!(
                                        "{} source {source} must be the total override of {}",
                                        spec.kind.name(),
                                        route.vault
                                    ),
                                    "final_yield_override",
                                ));
                            }
                            spec.label.as_str()
                        }
                        None => {
                            errors.push(ValidationError::with_rule(
                                item_field,
                                format!("Unknown source {source}"),
                                "known_source",
                            ));
                            continue;
                        }
                    },
                    RouteItem::Auxiliary { label, .. } => {
                        if label != LP_LABEL {
                            errors.push(ValidationError::with_rule(
                                format!("{item_field}.label"),
                                format!("Fee items are labeled {LP_LABEL:?}, got {label:?}"),
                                "fee_label",
                            ));
                        }
                        label.as_str()
                    }
                };
                if label != LP_LABEL && !labels.insert(label) {
                    errors.push(ValidationError::with_rule(
                        item_field,
                        format!("Duplicate label {label} in route of {}", route.vault),
                        "unique_label",
                    ));
                }
            }

            if let Some(ovr) = &route.total_override {
                let source = ovr.source();
                let routed = route.items.iter().any(|item| item.source() == Some(source));
                if !routed {
                    errors.push(ValidationError::with_rule(
                        format!("{field}.total_override"),
                        format!("Override source {source} is not routed to {}", route.vault),
                        "routed_override",
                    ));
                }
            }
        }

        errors
    }
}
