//! # Harvest Config
//!
//! Configuration management for the Harvest vault yield engine.
//!
//! - [`EngineConfig`]: batching, timeouts, refresh cadence, protocol constants
//! - [`RoutingConfig`]: the reward source catalog and per-vault routes
//! - [`Validate`]: validation shared by both, run before an engine is built
//!
//! Both load from TOML; routing configuration also loads from JSON.
//!
//! ```rust,ignore
//! use harvest_config::{EngineConfig, RoutingConfig, Validate};
//!
//! let engine = EngineConfig::from_file("config/engine.toml")?;
//! engine.validate_or_error()?;
//! let routing = RoutingConfig::load("config/harvest.toml")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod routing;

pub use engine::EngineConfig;
pub use error::{ConfigError, ConfigResult, Validate, ValidationError};
pub use routing::{
    RateBasis, RouteItem, RoutingConfig, SourceKind, SourceSpec, TotalOverride, VaultRoute,
};
