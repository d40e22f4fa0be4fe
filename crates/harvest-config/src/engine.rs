//! Engine configuration.
//!
//! Controls batching, per-source timeouts, refresh cadence and the protocol
//! constants shared by every reward source.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{read_config_file, ConfigResult, Validate, ValidationError};

// =============================================================================
// ENGINE CONFIGURATION
// =============================================================================

/// Configuration for the yield engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine name, used in log output.
    #[serde(default = "default_name")]
    pub name: String,

    /// Maximum number of source tasks joined by one batch barrier.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Per-source task timeout in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,

    /// Interval of the periodic price-refresh trigger, in seconds.
    #[serde(default = "default_price_refresh_interval_secs")]
    pub price_refresh_interval_secs: u64,

    /// Average block time used to annualize per-block emission rates.
    #[serde(default = "default_average_block_time_secs")]
    pub average_block_time_secs: f64,

    /// Fraction of emissions retained after performance fees.
    #[serde(default = "default_fee_discount")]
    pub fee_discount: f64,
}

fn default_name() -> String {
    "harvest-engine".to_string()
}

fn default_max_batch_size() -> usize {
    16
}

fn default_source_timeout_ms() -> u64 {
    10_000
}

fn default_price_refresh_interval_secs() -> u64 {
    120
}

fn default_average_block_time_secs() -> f64 {
    13.22
}

fn default_fee_discount() -> f64 {
    0.8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_batch_size: default_max_batch_size(),
            source_timeout_ms: default_source_timeout_ms(),
            price_refresh_interval_secs: default_price_refresh_interval_secs(),
            average_block_time_secs: default_average_block_time_secs(),
            fee_discount: default_fee_discount(),
        }
    }
}

impl EngineConfig {
    /// Creates a minimal configuration for testing.
    pub fn minimal() -> Self {
        Self {
            name: "harvest-test".to_string(),
            max_batch_size: 4,
            source_timeout_ms: 500,
            price_refresh_interval_secs: 1,
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = read_config_file(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Per-source task timeout.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Price-refresh timer period.
    pub fn price_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.price_refresh_interval_secs)
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push(ValidationError::new("name", "Name cannot be empty"));
        }

        if self.max_batch_size == 0 {
            errors.push(ValidationError::with_rule(
                "max_batch_size",
                "Batch size must be at least 1",
                "min_batch_size",
            ));
        }

        if self.source_timeout_ms == 0 {
            errors.push(ValidationError::with_rule(
                "source_timeout_ms",
                "Source timeout must be positive",
                "positive_timeout",
            ));
        }

        if self.price_refresh_interval_secs == 0 {
            errors.push(ValidationError::with_rule(
                "price_refresh_interval_secs",
                "Price refresh interval must be positive",
                "positive_interval",
            ));
        }

        if !(self.average_block_time_secs.is_finite() && self.average_block_time_secs > 0.0) {
            errors.push(ValidationError::with_rule(
                "average_block_time_secs",
                format!(
                    "Average block time {} must be a positive number",
                    self.average_block_time_secs
                ),
                "positive_block_time",
            ));
        }

        if !(0.0..=1.0).contains(&self.fee_discount) {
            errors.push(ValidationError::with_rule(
                "fee_discount",
                format!("Fee discount {} must be between 0 and 1", self.fee_discount),
                "unit_interval",
            ));
        }

        errors
    }
}
