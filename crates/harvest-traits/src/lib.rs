//! # Harvest Traits
//!
//! Trait definitions for the collaborators of the Harvest yield engine.
//!
//! This crate contains ONLY trait definitions and the identifiers they share.
//! Implementations live in extension crates (`harvest-ext-file`) or in the
//! host application.
//!
//! ## Module Structure
//!
//! - [`chain`]: contract state reads ([`ContractReader`])
//! - [`market`]: prices and off-chain yield data ([`PriceFeed`],
//!   [`PairPriceOracle`], [`HistoricalFeeSampler`], [`ExternalYieldApi`])
//! - [`provider`]: the [`Collaborators`] bundle handed to the engine
//!
//! ## Dependency Injection
//!
//! ```ignore
//! YieldEngineBuilder::new()
//!     .with_collaborators(Collaborators {
//!         contracts: Arc::new(my_reader),
//!         prices: Arc::new(my_feed),
//!         pairs: Arc::new(my_pair_oracle),
//!         fees: Arc::new(my_fee_sampler),
//!         external: Arc::new(my_yield_api),
//!     })
//!     .with_routing(routing_config)
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod error;
pub mod ids;
pub mod market;
pub mod provider;

// Re-export commonly used types
pub use chain::{CallArg, ContractCall, ContractReader, ContractValue};
pub use error::TraitError;
pub use ids::*;
pub use market::{ExternalYieldApi, HistoricalFeeSampler, PairPriceOracle, PriceFeed};
pub use provider::Collaborators;
