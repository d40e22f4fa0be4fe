//! Engine error types.

use thiserror::Error;

use harvest_config::ConfigError;
use harvest_core::CoreError;
use harvest_traits::TraitError;

/// Engine result type.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A newer cycle was already published; this cycle's report was discarded
    #[error("stale cycle {sequence}: cycle {latest} already published")]
    StaleCycle {
        /// Sequence of the discarded cycle
        sequence: u64,
        /// Sequence of the published cycle
        latest: u64,
    },

    /// Shutdown
    #[error("engine is shutting down")]
    Shutdown,
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::ConfigError(e.to_string())
    }
}

/// Source computation result type.
pub type SourceResult<T> = Result<T, SourceError>;

/// Why a reward source produced no contribution.
///
/// None of these reach the caller of a cycle: every variant degrades to an
/// empty contribution for the one source that raised it.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A price, upstream value or pair datum is unknown
    #[error("dependency unmet: {0}")]
    DependencyUnmet(String),

    /// Inputs were present but the arithmetic is meaningless (zero staked
    /// value, non-finite intermediate)
    #[error("computation invalid: {0}")]
    ComputationInvalid(String),

    /// A collaborator query failed
    #[error("transport: {0}")]
    Transport(TraitError),
}

impl SourceError {
    /// Returns true for collaborator failures, which are logged at `warn`.
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Transport(_))
    }
}

impl From<TraitError> for SourceError {
    fn from(e: TraitError) -> Self {
        match e {
            TraitError::NotFound(what) => SourceError::DependencyUnmet(format!("{what} not found")),
            other => SourceError::Transport(other),
        }
    }
}

impl From<CoreError> for SourceError {
    fn from(e: CoreError) -> Self {
        SourceError::ComputationInvalid(e.to_string())
    }
}
