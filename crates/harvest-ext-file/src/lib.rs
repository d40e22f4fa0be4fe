//! # Harvest Ext File
//!
//! File-backed collaborators for the Harvest yield engine.
//!
//! This crate provides default implementations for testing, replays and
//! offline runs:
//! - [`SnapshotCollaborators`]: a JSON snapshot implementing every collaborator
//!   trait, mutable in place between cycles
//! - `Empty*` collaborators that answer "unknown" to everything
//!
//! For live data, implement the `harvest-traits` interfaces against a node
//! and price APIs.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod empty;
mod snapshot;

pub use empty::*;
pub use snapshot::*;

use std::path::Path;
use std::sync::Arc;

use harvest_traits::{Collaborators, TraitError};

impl SnapshotCollaborators {
    /// Use this snapshot for every collaborator.
    pub fn into_collaborators(self: Arc<Self>) -> Collaborators {
        Collaborators {
            contracts: self.clone(),
            prices: self.clone(),
            pairs: self.clone(),
            fees: self.clone(),
            external: self,
        }
    }
}

/// Create collaborators backed by a JSON snapshot file.
pub fn create_snapshot_collaborators(
    path: impl AsRef<Path>,
) -> Result<(Arc<SnapshotCollaborators>, Collaborators), TraitError> {
    let snapshot = Arc::new(SnapshotCollaborators::new(path)?);
    Ok((snapshot.clone(), snapshot.into_collaborators()))
}

/// Create collaborators that know nothing (for testing/development).
pub fn create_empty_collaborators() -> Collaborators {
    Collaborators {
        contracts: Arc::new(EmptyContractReader),
        prices: Arc::new(EmptyPriceFeed),
        pairs: Arc::new(EmptyPairPriceOracle),
        fees: Arc::new(EmptyFeeSampler),
        external: Arc::new(EmptyYieldApi),
    }
}
