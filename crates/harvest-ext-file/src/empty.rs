//! Collaborators that know nothing.
//!
//! Every query answers "unknown", so every source degrades to an empty
//! contribution. Useful for wiring tests and for disabling one collaborator.

use async_trait::async_trait;

use harvest_traits::*;

/// Empty contract reader; every call reports the source as unavailable.
pub struct EmptyContractReader;

#[async_trait]
impl ContractReader for EmptyContractReader {
    async fn read(&self, call: &ContractCall) -> Result<ContractValue, TraitError> {
        Err(TraitError::SourceNotAvailable(format!(
            "no contract reader for {call}"
        )))
    }
}

/// Empty price feed.
pub struct EmptyPriceFeed;

#[async_trait]
impl PriceFeed for EmptyPriceFeed {
    async fn price(&self, _symbol: &TokenSymbol) -> Result<Option<f64>, TraitError> {
        Ok(None)
    }
}

/// Empty LP price oracle.
pub struct EmptyPairPriceOracle;

#[async_trait]
impl PairPriceOracle for EmptyPairPriceOracle {
    async fn price_per_token(&self, _token: &Address) -> Result<Option<f64>, TraitError> {
        Ok(None)
    }
}

/// Empty fee sampler.
pub struct EmptyFeeSampler;

#[async_trait]
impl HistoricalFeeSampler for EmptyFeeSampler {
    async fn fee_apr(&self, _pool: &PoolId) -> Result<Option<f64>, TraitError> {
        Ok(None)
    }
}

/// Empty external yield API.
pub struct EmptyYieldApi;

#[async_trait]
impl ExternalYieldApi for EmptyYieldApi {
    async fn reported_yield(&self, _key: &YieldKey) -> Result<Option<f64>, TraitError> {
        Ok(None)
    }
}
