//! Builder pattern for the yield engine.

use harvest_config::{EngineConfig, RoutingConfig, Validate};
use harvest_core::Vault;
use harvest_traits::Collaborators;

use crate::error::EngineError;
use crate::routing::RoutingTable;
use crate::YieldEngine;

/// Builder for constructing a [`YieldEngine`].
pub struct YieldEngineBuilder {
    config: Option<EngineConfig>,
    collaborators: Option<Collaborators>,
    routing: Option<RoutingTable>,
    vaults: Vec<Vault>,
}

impl YieldEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            collaborators: None,
            routing: None,
            vaults: Vec::new(),
        }
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the collaborator handles.
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    /// Set an already validated routing table.
    pub fn with_routing_table(mut self, routing: RoutingTable) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Validate and set a routing configuration.
    pub fn with_routing(mut self, routing: RoutingConfig) -> Result<Self, EngineError> {
        self.routing = Some(RoutingTable::from_config(routing)?);
        Ok(self)
    }

    /// Set the vaults refreshed by scheduled cycles.
    pub fn with_vaults(mut self, vaults: Vec<Vault>) -> Self {
        self.vaults = vaults;
        self
    }

    /// Build the yield engine.
    pub fn build(self) -> Result<YieldEngine, EngineError> {
        let config = self.config.unwrap_or_default();
        config.validate_or_error()?;

        let collaborators = self
            .collaborators
            .ok_or_else(|| EngineError::ConfigError("collaborators not configured".into()))?;

        let routing = self
            .routing
            .ok_or_else(|| EngineError::ConfigError("routing not configured".into()))?;

        Ok(YieldEngine::new(config, collaborators, routing, self.vaults))
    }
}

impl Default for YieldEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_ext_file::create_empty_collaborators;

    #[test]
    fn test_missing_collaborators() {
        let err = YieldEngineBuilder::new()
            .with_routing_table(RoutingTable::empty())
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_missing_routing() {
        let err = YieldEngineBuilder::new()
            .with_collaborators(create_empty_collaborators())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("routing"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            max_batch_size: 0,
            ..EngineConfig::default()
        };
        let err = YieldEngineBuilder::new()
            .with_config(config)
            .with_collaborators(create_empty_collaborators())
            .with_routing_table(RoutingTable::empty())
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_build() {
        let engine = YieldEngineBuilder::new()
            .with_config(EngineConfig::minimal())
            .with_collaborators(create_empty_collaborators())
            .with_routing_table(RoutingTable::empty())
            .with_vaults(vec![Vault::new("pSLP DAI", "0x1")])
            .build()
            .unwrap();
        assert_eq!(engine.vaults().len(), 1);
        assert_eq!(engine.config().max_batch_size, 4);
    }
}
