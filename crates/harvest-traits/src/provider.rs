//! Collaborator bundle.

use std::sync::Arc;

use crate::chain::ContractReader;
use crate::market::{ExternalYieldApi, HistoricalFeeSampler, PairPriceOracle, PriceFeed};

/// Combined collaborator handles, shared by every task in a cycle.
#[derive(Clone)]
pub struct Collaborators {
    /// Contract state reader
    pub contracts: Arc<dyn ContractReader>,
    /// Token price feed
    pub prices: Arc<dyn PriceFeed>,
    /// LP token price oracle
    pub pairs: Arc<dyn PairPriceOracle>,
    /// Trading-fee yield sampler
    pub fees: Arc<dyn HistoricalFeeSampler>,
    /// Third-party yield reports
    pub external: Arc<dyn ExternalYieldApi>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
