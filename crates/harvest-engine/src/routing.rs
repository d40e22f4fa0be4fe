//! Routing table and per-cycle task planning.
//!
//! The [`RoutingTable`] is an immutable snapshot of a validated
//! [`RoutingConfig`]: a source catalog keyed by id plus one route per vault.
//! [`RoutingTable::plan`] turns the vaults of one cycle into dependency
//! waves of distinct tasks, so every source is computed once per cycle no
//! matter how many vaults reference it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use harvest_config::{RouteItem, RoutingConfig, SourceSpec, TotalOverride, Validate, VaultRoute};
use harvest_core::Vault;
use harvest_traits::{PoolId, SourceId, TokenSymbol, VaultId};

use crate::error::EngineResult;

// =============================================================================
// TASKS
// =============================================================================

/// One distinct unit of work in a cycle.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskKey {
    /// A catalog reward source
    Source(SourceId),
    /// Fee data of a pool
    Fee(PoolId),
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::Source(id) => write!(f, "source:{id}"),
            TaskKey::Fee(pool) => write!(f, "fee:{pool}"),
        }
    }
}

/// Distinct tasks of one cycle, grouped into dependency waves.
///
/// Wave 0 holds every task without dependencies; wave `n` only depends on
/// waves before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CyclePlan {
    waves: Vec<Vec<TaskKey>>,
}

impl CyclePlan {
    /// The waves in execution order.
    pub fn waves(&self) -> &[Vec<TaskKey>] {
        &self.waves
    }

    /// Total number of tasks.
    pub fn task_count(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    /// Returns true if the plan has no task.
    pub fn is_empty(&self) -> bool {
        self.waves.iter().all(Vec::is_empty)
    }

    /// Iterate every task in wave order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskKey> {
        self.waves.iter().flatten()
    }
}

// =============================================================================
// ROUTING TABLE
// =============================================================================

/// Immutable source catalog and vault routes.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    sources: HashMap<SourceId, Arc<SourceSpec>>,
    routes: HashMap<VaultId, VaultRoute>,
}

impl RoutingTable {
    /// Build a table from a configuration, validating it first.
    pub fn from_config(config: RoutingConfig) -> EngineResult<Self> {
        config.validate_or_error()?;

        let sources = config
            .sources
            .into_iter()
            .map(|spec| (spec.id.clone(), Arc::new(spec)))
            .collect();
        let routes = config
            .vaults
            .into_iter()
            .map(|route| (route.vault.clone(), route))
            .collect();

        Ok(Self { sources, routes })
    }

    /// A table that routes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a catalog source.
    pub fn source(&self, id: &SourceId) -> Option<&Arc<SourceSpec>> {
        self.sources.get(id)
    }

    /// Route of `vault`, if it is mapped.
    pub fn route(&self, vault: &VaultId) -> Option<&VaultRoute> {
        self.routes.get(vault)
    }

    /// Route items of `vault`; an unmapped vault has none.
    pub fn items_for(&self, vault: &VaultId) -> &[RouteItem] {
        self.route(vault)
            .map(|r| r.items.as_slice())
            .unwrap_or(&[])
    }

    /// Total override of `vault`, if declared.
    pub fn total_override(&self, vault: &VaultId) -> Option<&TotalOverride> {
        self.route(vault).and_then(|r| r.total_override.as_ref())
    }

    /// Number of catalog sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of routed vaults.
    pub fn vault_count(&self) -> usize {
        self.routes.len()
    }

    /// Plan the distinct tasks needed to serve `vaults`.
    pub fn plan(&self, vaults: &[Vault]) -> CyclePlan {
        let mut fees = BTreeSet::new();
        let mut pending: Vec<SourceId> = Vec::new();

        for vault in vaults {
            for item in self.items_for(&vault.name) {
                match item {
                    RouteItem::Reward { source } => pending.push(source.clone()),
                    RouteItem::Auxiliary { fee_pool, .. } => {
                        fees.insert(fee_pool.clone());
                    }
                }
            }
            if let Some(total_override) = self.total_override(&vault.name) {
                pending.push(total_override.source().clone());
            }
        }

        // transitive closure over dependencies
        let mut required = BTreeSet::new();
        while let Some(id) = pending.pop() {
            let Some(spec) = self.sources.get(&id) else {
                warn!(source = %id, "route references an unknown source");
                continue;
            };
            if required.insert(id) {
                pending.extend(spec.dependencies().into_iter().cloned());
            }
        }

        let mut levels: BTreeMap<SourceId, usize> = BTreeMap::new();
        let mut remaining: Vec<SourceId> = required.into_iter().collect();
        while !remaining.is_empty() {
            let mut deferred = Vec::new();
            let mut progressed = false;
            for id in remaining {
                let deps = self
                    .sources
                    .get(&id)
                    .map(|spec| spec.dependencies())
                    .unwrap_or_default();
                let dep_levels: Option<Vec<usize>> =
                    deps.iter().map(|dep| levels.get(*dep).copied()).collect();
                match dep_levels {
                    Some(dep_levels) => {
                        let level = dep_levels.into_iter().map(|l| l + 1).max().unwrap_or(0);
                        levels.insert(id, level);
                        progressed = true;
                    }
                    None => deferred.push(id),
                }
            }
            if !progressed {
                for id in &deferred {
                    warn!(source = %id, "dropping source with unresolvable dependencies");
                }
                break;
            }
            remaining = deferred;
        }

        let depth = levels.values().copied().max().map_or(0, |l| l + 1);
        let mut waves: Vec<Vec<TaskKey>> = vec![Vec::new(); depth.max(1)];
        for (id, level) in levels {
            waves[level].push(TaskKey::Source(id));
        }
        waves[0].extend(fees.into_iter().map(TaskKey::Fee));

        if waves.iter().all(Vec::is_empty) {
            waves.clear();
        }

        CyclePlan { waves }
    }

    /// Price symbols needed by the sources of `plan`, deduplicated.
    pub fn price_symbols(&self, plan: &CyclePlan) -> Vec<TokenSymbol> {
        let symbols: BTreeSet<TokenSymbol> = plan
            .tasks()
            .filter_map(|task| match task {
                TaskKey::Source(id) => self.sources.get(id),
                TaskKey::Fee(_) => None,
            })
            .flat_map(|spec| spec.price_symbols().into_iter().cloned())
            .collect();
        symbols.into_iter().collect()
    }
}
