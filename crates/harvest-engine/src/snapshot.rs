//! Per-cycle price snapshot.
//!
//! Prices are captured once at the start of a cycle and shared read-only by
//! every source task, so a price update arriving mid-cycle never splits a
//! cycle between two price sets.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use harvest_traits::{PriceFeed, TokenSymbol};

use crate::error::{SourceError, SourceResult};

/// Immutable USD price table for one cycle.
#[derive(Debug, Clone)]
pub struct PriceTable {
    prices: HashMap<TokenSymbol, f64>,
    captured_at: DateTime<Utc>,
}

impl PriceTable {
    /// Build a table from known prices.
    pub fn new(prices: HashMap<TokenSymbol, f64>) -> Self {
        Self {
            prices,
            captured_at: Utc::now(),
        }
    }

    /// A table with no prices.
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Query `feed` for every symbol concurrently.
    ///
    /// Unknown, non-positive and failed lookups are left out of the table.
    pub async fn capture(feed: &dyn PriceFeed, symbols: &[TokenSymbol]) -> Self {
        let lookups = join_all(symbols.iter().map(|symbol| async move {
            (symbol, feed.price(symbol).await)
        }))
        .await;

        let mut prices = HashMap::with_capacity(symbols.len());
        for (symbol, result) in lookups {
            match result {
                Ok(Some(price)) if price.is_finite() && price > 0.0 => {
                    prices.insert(symbol.clone(), price);
                }
                Ok(Some(price)) => {
                    debug!(token = %symbol, price, "discarding unusable price");
                }
                Ok(None) => {
                    debug!(token = %symbol, "price unknown");
                }
                Err(e) => {
                    warn!(token = %symbol, error = %e, "price lookup failed");
                }
            }
        }

        Self {
            prices,
            captured_at: Utc::now(),
        }
    }

    /// Price of `symbol`, if known.
    pub fn get(&self, symbol: &TokenSymbol) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Price of `symbol`, or [`SourceError::DependencyUnmet`].
    pub fn require(&self, symbol: &TokenSymbol) -> SourceResult<f64> {
        self.get(symbol)
            .ok_or_else(|| SourceError::DependencyUnmet(format!("price of {symbol}")))
    }

    /// Number of known prices.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns true if no price is known.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// When the table was captured.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
