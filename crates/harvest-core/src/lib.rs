//! # Harvest Core
//!
//! Core types and pure arithmetic for the Harvest vault yield engine.
//!
//! This crate provides the foundational building blocks used throughout Harvest:
//!
//! - **Types**: [`Vault`], [`VaultId`], [`RewardContribution`], [`Breakdown`], [`VaultYield`]
//! - **Units**: fixed-point token amount conversion ([`units`])
//! - **Compounding**: the closed-form daily compounding formula and the
//!   simulated daily reinvestment strategy ([`compounding`])
//! - **Composition**: the reduction of a vault's contribution list into
//!   `{apr, APYs, totalAPY}` ([`composition`])
//!
//! ## Design Philosophy
//!
//! Pure functions only. Nothing in this crate performs I/O, caches, or mutates
//! its inputs: a breakdown and its scalar totals are derived values.
//!
//! ## Example
//!
//! ```rust
//! use harvest_core::prelude::*;
//!
//! let contributions = vec![
//!     RewardContribution::new("sushi", compound_daily(0.10)).with_apr(10.0),
//!     RewardContribution::lp(2.5),
//! ];
//!
//! let composition = compose(&contributions, None);
//! assert_eq!(composition.apr, 10.0);
//! assert!((composition.total_apy - (compound_daily(0.10) + 2.5)).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod compounding;
pub mod composition;
pub mod contribution;
pub mod error;
pub mod units;
pub mod vault;

pub use compounding::{compound_daily, simulated_reinvestment, DAYS_PER_YEAR, EMISSION_YEAR_SECONDS};
pub use composition::{compose, Composition, VaultYield};
pub use contribution::{Breakdown, RewardContribution, LP_LABEL};
pub use error::{CoreError, CoreResult};
pub use vault::{Vault, VaultId};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::compounding::{compound_daily, simulated_reinvestment};
    pub use crate::composition::{compose, Composition, VaultYield};
    pub use crate::contribution::{Breakdown, RewardContribution, LP_LABEL};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::vault::{Vault, VaultId};
}
