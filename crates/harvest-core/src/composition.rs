//! The contribution calculator.
//!
//! Reduces a vault's contribution list to `{apr, APYs, totalAPY}`:
//!
//! 1. `apr` is the sum of every contribution's `apr` (percent).
//! 2. `lp` is the sum of every `lp`-labeled entry (percent, additive).
//! 3. `totalAPY = compound_daily(apr / 100) + lp`, unless an override is given,
//!    in which case the override is used verbatim.
//!
//! The breakdown (`APYs`) is derived from the same input as the scalars and
//! never carries `apr` keys. Non-finite values are left out of every sum.

use serde::{Deserialize, Serialize};

use crate::compounding::compound_daily;
use crate::contribution::{Breakdown, RewardContribution};
use crate::vault::VaultId;

/// Result of reducing one contribution list.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Sum of the `apr` fields (percent)
    pub apr: f64,
    /// Sum of the `lp` entries (percent)
    pub lp: f64,
    /// Display breakdown, one entry per contribution
    pub apys: Vec<Breakdown>,
    /// Composite yield (percent)
    pub total_apy: f64,
    /// Whether `total_apy` came from an override
    pub overridden: bool,
}

impl Composition {
    /// Attach the vault identity.
    pub fn into_vault_yield(self, vault: VaultId) -> VaultYield {
        VaultYield {
            vault,
            apr: self.apr,
            apys: self.apys,
            total_apy: self.total_apy,
            overridden: self.overridden,
        }
    }
}

/// Reduces `contributions` into a [`Composition`].
///
/// `total_override` replaces the compounded total when it is finite.
pub fn compose(contributions: &[RewardContribution], total_override: Option<f64>) -> Composition {
    let apr: f64 = contributions
        .iter()
        .filter_map(RewardContribution::apr)
        .filter(|apr| apr.is_finite())
        .fold(0.0, |acc, v| acc + v);

    let lp = contributions
        .iter()
        .map(RewardContribution::lp_value)
        .fold(0.0, |acc, v| acc + v);

    let apys = contributions
        .iter()
        .map(RewardContribution::breakdown)
        .collect();

    let (total_apy, overridden) = match total_override.filter(|v| v.is_finite()) {
        Some(value) => (value, true),
        None => (compound_daily(apr / 100.0) + lp, false),
    };

    Composition {
        apr,
        lp,
        apys,
        total_apy,
        overridden,
    }
}

/// Per-vault output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultYield {
    /// Vault identity
    pub vault: VaultId,
    /// Sum of contributing APRs (percent)
    pub apr: f64,
    /// Labeled breakdown for display
    #[serde(rename = "APYs")]
    pub apys: Vec<Breakdown>,
    /// Composite yield (percent)
    #[serde(rename = "totalAPY")]
    pub total_apy: f64,
    /// Whether the total was set by a routing override
    #[serde(default)]
    pub overridden: bool,
}

impl VaultYield {
    /// A zero-yield record for a vault with no contributions.
    pub fn empty(vault: VaultId) -> Self {
        compose(&[], None).into_vault_yield(vault)
    }

    /// All breakdown labels in display order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.apys.iter().flat_map(Breakdown::labels)
    }
}
