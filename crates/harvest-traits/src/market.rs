//! Price and off-chain yield traits.
//!
//! These traits define interfaces for market-side data providers:
//! - [`PriceFeed`]: USD token prices by symbol
//! - [`PairPriceOracle`]: USD price of one LP / pool share token
//! - [`HistoricalFeeSampler`]: trailing trading-fee yield of a pool
//! - [`ExternalYieldApi`]: yields reported by third-party aggregators
//!
//! `Ok(None)` means "unknown", which callers treat as an unmet precondition
//! rather than a failure.

use async_trait::async_trait;

use crate::error::TraitError;
use crate::ids::*;

// =============================================================================
// PRICE FEED
// =============================================================================

/// Trait for token price providers.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// USD price of a token.
    async fn price(&self, symbol: &TokenSymbol) -> Result<Option<f64>, TraitError>;

    /// USD prices of several tokens, positional.
    async fn prices(&self, symbols: &[TokenSymbol]) -> Result<Vec<Option<f64>>, TraitError> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            out.push(self.price(symbol).await?);
        }
        Ok(out)
    }
}

// =============================================================================
// PAIR PRICE ORACLE
// =============================================================================

/// Trait for LP token price providers.
#[async_trait]
pub trait PairPriceOracle: Send + Sync {
    /// USD price of one unit of the pool share token at `token`.
    async fn price_per_token(&self, token: &Address) -> Result<Option<f64>, TraitError>;
}

// =============================================================================
// HISTORICAL FEE SAMPLER
// =============================================================================

/// Trait for trading-fee yield samplers (day data, pool stats).
#[async_trait]
pub trait HistoricalFeeSampler: Send + Sync {
    /// Trailing annualized fee yield of a pool, in percent.
    async fn fee_apr(&self, pool: &PoolId) -> Result<Option<f64>, TraitError>;
}

// =============================================================================
// EXTERNAL YIELD API
// =============================================================================

/// Trait for third-party yield reports.
#[async_trait]
pub trait ExternalYieldApi: Send + Sync {
    /// Reported yield as a fraction (0.07 = 7%).
    async fn reported_yield(&self, key: &YieldKey) -> Result<Option<f64>, TraitError>;
}
