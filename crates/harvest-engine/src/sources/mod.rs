//! Reward source computations.
//!
//! One async function per [`SourceKind`]. Each reads only its declared
//! inputs (collaborators, the cycle's [`PriceTable`], results of the sources
//! it depends on) and returns exactly one [`RewardContribution`] or a
//! [`SourceError`] explaining why there is none.
//!
//! Emission-based kinds share one pipeline ([`Emission`]):
//!
//! ```text
//! rate -> tokens/year -> x reward price -> / (staked units x staked price)
//!      -> raw APR -> x fee discount -> { label: compound_daily(apr), apr: apr x 100 }
//! ```

mod chef;
mod external;
mod reinvest;
mod staking;

use std::collections::HashMap;
use std::sync::Arc;

use harvest_config::{EngineConfig, SourceKind, SourceSpec};
use harvest_core::error::{ensure_finite, ensure_positive};
use harvest_core::units::format_ether;
use harvest_core::{compound_daily, RewardContribution, EMISSION_YEAR_SECONDS};
use harvest_traits::{
    Address, Collaborators, ContractCall, ContractValue, SourceId, TokenSymbol, TraitError,
};

use crate::error::{SourceError, SourceResult};
use crate::snapshot::PriceTable;

pub use external::fee_contribution;

/// Everything a source computation may read.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Collaborator handles
    pub collaborators: Collaborators,
    /// The cycle's price table
    pub prices: Arc<PriceTable>,
    /// Engine configuration
    pub config: Arc<EngineConfig>,
    /// Results of sources computed in earlier waves
    pub upstream: Arc<HashMap<SourceId, RewardContribution>>,
}

impl SourceContext {
    /// Context with no upstream results.
    pub fn new(
        collaborators: Collaborators,
        prices: Arc<PriceTable>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            collaborators,
            prices,
            config,
            upstream: Arc::new(HashMap::new()),
        }
    }

    /// Replace the upstream results.
    pub fn with_upstream(mut self, upstream: Arc<HashMap<SourceId, RewardContribution>>) -> Self {
        self.upstream = upstream;
        self
    }

    /// Read several calls, failing on the first failed read.
    async fn read_all(&self, calls: &[ContractCall]) -> SourceResult<Vec<ContractValue>> {
        let results = self.collaborators.contracts.read_batch(calls).await;
        if results.len() != calls.len() {
            return Err(SourceError::Transport(TraitError::UnexpectedValue(format!(
                "batch of {} calls returned {} results",
                calls.len(),
                results.len()
            ))));
        }
        results
            .into_iter()
            .map(|r| r.map_err(SourceError::from))
            .collect()
    }

    /// Read several 18-decimal amounts.
    async fn read_amounts(&self, calls: &[ContractCall]) -> SourceResult<Vec<f64>> {
        self.read_all(calls)
            .await?
            .iter()
            .map(|value| Ok(format_ether(value.as_uint()?)))
            .collect()
    }

    /// Read an address.
    async fn read_address(&self, call: ContractCall) -> SourceResult<Address> {
        let value = self.collaborators.contracts.read(&call).await?;
        Ok(value.as_address()?.clone())
    }

    /// USD price of one staked token: by symbol when given, else from the
    /// pair oracle.
    async fn staked_price(
        &self,
        token: &Address,
        symbol: Option<&TokenSymbol>,
    ) -> SourceResult<f64> {
        if let Some(symbol) = symbol {
            return self.prices.require(symbol);
        }
        match self.collaborators.pairs.price_per_token(token).await? {
            Some(price) if price.is_finite() && price > 0.0 => Ok(price),
            _ => Err(SourceError::DependencyUnmet(format!("pair price of {token}"))),
        }
    }

    /// Fee discount for an emission source.
    fn emission_discount(&self, spec: &SourceSpec) -> f64 {
        spec.fee_discount.unwrap_or(self.config.fee_discount)
    }

    /// Annualize a per-block amount.
    fn per_block_to_year(&self, per_block: f64) -> f64 {
        per_block * EMISSION_YEAR_SECONDS / self.config.average_block_time_secs
    }
}

/// Annualize a per-second amount.
fn per_second_to_year(per_second: f64) -> f64 {
    per_second * EMISSION_YEAR_SECONDS
}

// =============================================================================
// EMISSION PIPELINE
// =============================================================================

/// Inputs of the emission APR formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Reward tokens emitted to the pool per year
    pub tokens_per_year: f64,
    /// USD price of the reward token
    pub reward_price: f64,
    /// Units staked in the pool
    pub staked_units: f64,
    /// USD price of one staked unit
    pub staked_price: f64,
}

impl Emission {
    /// Raw APR as a fraction.
    pub fn raw_apr(&self) -> SourceResult<f64> {
        let rewarded = ensure_finite("value rewarded per year", self.tokens_per_year * self.reward_price)?;
        let staked = ensure_positive("total value staked", self.staked_units * self.staked_price)?;
        Ok(ensure_finite("raw apr", rewarded / staked)?)
    }

    /// The labeled contribution after the fee discount.
    pub fn contribution(&self, label: &str, fee_discount: f64) -> SourceResult<RewardContribution> {
        let apr = self.raw_apr()? * fee_discount;
        Ok(compounding_contribution(label, apr))
    }
}

/// `{label: compound_daily(apr), apr: apr x 100}` for a post-fee APR fraction.
pub fn compounding_contribution(label: &str, apr: f64) -> RewardContribution {
    RewardContribution::new(label, compound_daily(apr)).with_apr(apr * 100.0)
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Compute one source.
pub async fn compute(spec: &SourceSpec, ctx: &SourceContext) -> SourceResult<RewardContribution> {
    match &spec.kind {
        SourceKind::StakingRewards { .. } => staking::staking_rewards(spec, ctx).await,
        SourceKind::RewardsForDuration { .. } => staking::rewards_for_duration(spec, ctx).await,
        SourceKind::MasterChef { .. } => chef::master_chef(spec, ctx).await,
        SourceKind::Rewarder { .. } => chef::rewarder(spec, ctx).await,
        SourceKind::WeightedPool { .. } => chef::weighted_pool(spec, ctx).await,
        SourceKind::ExternalEmission { .. } => external::external_emission(spec, ctx).await,
        SourceKind::PassThrough { .. } => external::pass_through(spec, ctx).await,
        SourceKind::Reinvestment { .. } => reinvest::reinvestment(spec, ctx),
    }
}

/// Error for a spec routed to the wrong computation.
fn kind_mismatch(spec: &SourceSpec, expected: &str) -> SourceError {
    SourceError::ComputationInvalid(format!(
        "source {} is {}, expected {expected}",
        spec.id,
        spec.kind.name()
    ))
}
