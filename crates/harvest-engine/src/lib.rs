//! # Harvest Engine
//!
//! The concurrent vault yield aggregation engine for Harvest.
//!
//! This crate provides:
//! - [`RoutingTable`]: vault routes and per-cycle task planning
//! - [`Aggregator`]: batched fan-out of distinct reward sources, fan-in per vault
//! - [`CycleBoard`]: cycle tagging and last-cycle-wins publication
//! - [`RefreshScheduler`]: block and timer triggers
//! - [`YieldEngine`]: main engine orchestrating all components
//!
//! ## Architecture
//!
//! ```text
//! Trigger ─> YieldEngine ─> RoutingTable::plan ─> PriceTable::capture
//!                      │
//!                      └─> Aggregator ─┬─> wave 0 batches ─> sources::compute
//!                                      ├─> wave 1 batches (reinvestment)
//!                                      └─> per vault: route ─> compose
//!                                                       │
//!                          CycleBoard <─ CycleReport <──┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(
//!     YieldEngineBuilder::new()
//!         .with_config(EngineConfig::from_file("engine.toml")?)
//!         .with_collaborators(collaborators)
//!         .with_routing(RoutingConfig::load("config/harvest.toml")?)?
//!         .with_vaults(vaults)
//!         .build()?,
//! );
//!
//! let report = engine.run_cycle(Trigger::Manual).await?;
//! let scheduler = RefreshScheduler::new(engine.clone(), block_rx).spawn();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod builder;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod routing;
pub mod scheduler;
pub mod snapshot;
pub mod sources;

// Re-exports
pub use aggregator::{AggregateOutput, Aggregator, CycleStats};
pub use builder::YieldEngineBuilder;
pub use cycle::{CycleBoard, CycleReport, CycleTag, Trigger};
pub use engine::YieldEngine;
pub use error::{EngineError, EngineResult, SourceError, SourceResult};
pub use routing::{CyclePlan, RoutingTable, TaskKey};
pub use scheduler::{RefreshScheduler, MIN_REFRESH_INTERVAL};
pub use snapshot::PriceTable;
pub use sources::{Emission, SourceContext};
