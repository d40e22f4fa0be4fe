//! Fan-out / fan-in aggregation of one cycle.
//!
//! ```text
//! vaults ─> plan ─> price table ─> wave 0 ─┬─ batch ─ spawn x N ─ join_all
//!                                          └─ batch ─ ...
//!                                  wave 1 (reads wave 0 results) ─> ...
//!        ─> per vault: route items ─> override ─> compose ─> VaultYield
//! ```
//!
//! Each batch is an all-or-none barrier: every member runs as its own task
//! and the batch completes when all of them have finished, failed, timed out
//! or panicked. A failing member only removes its own contribution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use harvest_config::{EngineConfig, RouteItem, SourceSpec, TotalOverride};
use harvest_core::{compose, RewardContribution, Vault, VaultYield};
use harvest_traits::{Collaborators, PoolId, SourceId};

use crate::cycle::CycleTag;
use crate::error::{SourceError, SourceResult};
use crate::routing::{CyclePlan, RoutingTable, TaskKey};
use crate::snapshot::PriceTable;
use crate::sources::{self, SourceContext};

/// Execution statistics of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Vaults in the cycle
    pub vaults: usize,
    /// Distinct tasks planned
    pub tasks: usize,
    /// Dependency waves
    pub waves: usize,
    /// Batches executed
    pub batches: usize,
    /// Tasks that produced a contribution
    pub computed: usize,
    /// Tasks whose inputs were unknown
    pub unmet: usize,
    /// Tasks whose arithmetic was meaningless
    pub invalid: usize,
    /// Tasks whose collaborator queries failed
    pub failed: usize,
    /// Tasks cut off by the source timeout
    pub timed_out: usize,
    /// Tasks that panicked
    pub panicked: usize,
    /// Wall time in milliseconds
    pub elapsed_ms: u64,
}

impl CycleStats {
    /// Tasks that produced no contribution.
    pub fn empty(&self) -> usize {
        self.unmet + self.invalid + self.failed + self.timed_out + self.panicked
    }
}

/// Per-vault records plus statistics.
#[derive(Debug, Clone)]
pub struct AggregateOutput {
    /// One record per input vault, in input order
    pub results: Vec<VaultYield>,
    /// Execution statistics
    pub stats: CycleStats,
}

/// Task results of one cycle.
#[derive(Debug, Default)]
struct TaskResults {
    sources: HashMap<SourceId, RewardContribution>,
    fees: HashMap<PoolId, RewardContribution>,
}

impl TaskResults {
    fn insert(&mut self, key: TaskKey, contribution: RewardContribution) {
        match key {
            TaskKey::Source(id) => {
                self.sources.insert(id, contribution);
            }
            TaskKey::Fee(pool) => {
                self.fees.insert(pool, contribution);
            }
        }
    }
}

/// Runs cycles against one set of collaborators.
#[derive(Debug, Clone)]
pub struct Aggregator {
    collaborators: Collaborators,
    config: Arc<EngineConfig>,
}

impl Aggregator {
    /// Create an aggregator.
    pub fn new(collaborators: Collaborators, config: Arc<EngineConfig>) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Plan, capture prices, compute and reduce one cycle.
    pub async fn run(
        &self,
        table: &RoutingTable,
        vaults: &[Vault],
        tag: &CycleTag,
    ) -> AggregateOutput {
        let plan = table.plan(vaults);
        let symbols = table.price_symbols(&plan);
        let prices = PriceTable::capture(self.collaborators.prices.as_ref(), &symbols).await;
        debug!(
            cycle = tag.sequence,
            "captured {} of {} prices",
            prices.len(),
            symbols.len()
        );
        self.execute(table, &plan, Arc::new(prices), vaults, tag).await
    }

    /// Compute `plan` against a fixed price table and reduce every vault.
    pub async fn execute(
        &self,
        table: &RoutingTable,
        plan: &CyclePlan,
        prices: Arc<PriceTable>,
        vaults: &[Vault],
        tag: &CycleTag,
    ) -> AggregateOutput {
        let start = Instant::now();
        let mut stats = CycleStats {
            vaults: vaults.len(),
            tasks: plan.task_count(),
            waves: plan.waves().len(),
            ..CycleStats::default()
        };

        let base = SourceContext::new(self.collaborators.clone(), prices, Arc::clone(&self.config));
        let batch_size = self.config.max_batch_size.max(1);
        let source_timeout = self.config.source_timeout();
        let mut results = TaskResults::default();

        for wave in plan.waves() {
            let ctx = base
                .clone()
                .with_upstream(Arc::new(results.sources.clone()));
            for batch in wave.chunks(batch_size) {
                stats.batches += 1;
                self.run_batch(table, batch, &ctx, source_timeout, tag, &mut results, &mut stats)
                    .await;
            }
        }

        let results = vaults
            .iter()
            .map(|vault| reduce(table, vault, &results, tag))
            .collect();

        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        AggregateOutput { results, stats }
    }

    /// Spawn every member of `batch`, then wait for all of them.
    #[allow(clippy::too_many_arguments)]
    async fn run_batch(
        &self,
        table: &RoutingTable,
        batch: &[TaskKey],
        ctx: &SourceContext,
        source_timeout: Duration,
        tag: &CycleTag,
        results: &mut TaskResults,
        stats: &mut CycleStats,
    ) {
        let handles = batch.iter().map(|key| {
            let spec = match key {
                TaskKey::Source(id) => table.source(id).cloned(),
                TaskKey::Fee(_) => None,
            };
            let task = run_task(key.clone(), spec, ctx.clone());
            tokio::spawn(timeout(source_timeout, task))
        });
        let joined = join_all(handles).await;

        for (key, outcome) in batch.iter().zip(joined) {
            match outcome {
                Ok(Ok(Ok(contribution))) if contribution.is_finite() => {
                    stats.computed += 1;
                    results.insert(key.clone(), contribution);
                }
                Ok(Ok(Ok(_))) => {
                    stats.invalid += 1;
                    debug!(cycle = tag.sequence, source = %key, "discarding non-finite contribution");
                }
                Ok(Ok(Err(e))) => match &e {
                    SourceError::DependencyUnmet(_) => {
                        stats.unmet += 1;
                        debug!(cycle = tag.sequence, source = %key, error = %e, "source unavailable");
                    }
                    SourceError::ComputationInvalid(_) => {
                        stats.invalid += 1;
                        debug!(cycle = tag.sequence, source = %key, error = %e, "source unavailable");
                    }
                    SourceError::Transport(_) => {
                        stats.failed += 1;
                        warn!(cycle = tag.sequence, source = %key, error = %e, "source query failed");
                    }
                },
                Ok(Err(_)) => {
                    stats.timed_out += 1;
                    warn!(
                        cycle = tag.sequence,
                        source = %key,
                        "source timed out after {:?}",
                        source_timeout
                    );
                }
                Err(e) => {
                    stats.panicked += 1;
                    warn!(cycle = tag.sequence, source = %key, error = %e, "source task aborted");
                }
            }
        }
    }
}

async fn run_task(
    key: TaskKey,
    spec: Option<Arc<SourceSpec>>,
    ctx: SourceContext,
) -> SourceResult<RewardContribution> {
    match key {
        TaskKey::Source(id) => {
            let spec = spec
                .ok_or_else(|| SourceError::DependencyUnmet(format!("source {id} not in catalog")))?;
            sources::compute(&spec, &ctx).await
        }
        TaskKey::Fee(pool) => sources::fee_contribution(&ctx.collaborators, &pool).await,
    }
}

/// Route one vault's contributions and compose them.
fn reduce(
    table: &RoutingTable,
    vault: &Vault,
    results: &TaskResults,
    tag: &CycleTag,
) -> VaultYield {
    let mut contributions = Vec::new();

    for item in table.items_for(&vault.name) {
        match item {
            RouteItem::Reward { source } => match results.sources.get(source) {
                Some(c) => contributions.push(c.clone()),
                None => {
                    debug!(cycle = tag.sequence, vault = %vault.name, source = %source, "no contribution");
                }
            },
            RouteItem::Auxiliary { fee_pool, .. } => match results.fees.get(fee_pool) {
                Some(c) => contributions.push(c.clone()),
                None => {
                    debug!(cycle = tag.sequence, vault = %vault.name, pool = %fee_pool, "no fee data");
                }
            },
        }
    }

    let total_override = table
        .total_override(&vault.name)
        .and_then(|o| override_value(o, results));
    if table.total_override(&vault.name).is_some() && total_override.is_none() {
        debug!(
            cycle = tag.sequence,
            vault = %vault.name,
            "override source unavailable, using compounded total"
        );
    }

    compose(&contributions, total_override).into_vault_yield(vault.name.clone())
}

fn override_value(total_override: &TotalOverride, results: &TaskResults) -> Option<f64> {
    match total_override {
        TotalOverride::AprOf { source } => results.sources.get(source).and_then(RewardContribution::apr),
        TotalOverride::LabelOf { source, label } => {
            results.sources.get(source).and_then(|c| c.value(label))
        }
    }
    .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::{CycleBoard, Trigger};
    use approx::assert_relative_eq;
    use harvest_config::{RoutingConfig, SourceKind, VaultRoute};
    use harvest_core::{compound_daily, LP_LABEL};
    use harvest_ext_file::SnapshotCollaborators;

    fn pass_through(id: &str, label: &str) -> SourceSpec {
        SourceSpec {
            id: id.into(),
            label: label.to_string(),
            fee_discount: None,
            kind: SourceKind::PassThrough { key: id.into() },
        }
    }

    fn emission(id: &str, label: &str) -> SourceSpec {
        SourceSpec {
            id: id.into(),
            label: label.to_string(),
            fee_discount: None,
            kind: SourceKind::ExternalEmission { key: id.into() },
        }
    }

    fn setup(
        vaults: Vec<VaultRoute>,
        sources: Vec<SourceSpec>,
    ) -> (Arc<SnapshotCollaborators>, Aggregator, RoutingTable) {
        let snapshot = Arc::new(SnapshotCollaborators::empty());
        let aggregator = Aggregator::new(
            Arc::clone(&snapshot).into_collaborators(),
            Arc::new(EngineConfig::minimal()),
        );
        let table = RoutingTable::from_config(RoutingConfig { sources, vaults }).unwrap();
        (snapshot, aggregator, table)
    }

    fn tag() -> CycleTag {
        CycleBoard::new().next_tag(Trigger::Manual)
    }

    #[tokio::test]
    async fn test_fee_label_and_sum() {
        let (snapshot, aggregator, table) = setup(
            vec![VaultRoute {
                vault: "pSLP".into(),
                items: vec![
                    RouteItem::Reward { source: "sushi".into() },
                    RouteItem::Auxiliary {
                        fee_pool: "pool".into(),
                        label: LP_LABEL.to_string(),
                    },
                ],
                total_override: None,
            }],
            vec![emission("sushi", "sushi")],
        );
        snapshot.set_external_yield("sushi", 0.125);
        snapshot.set_fee_apr("pool", 3.0);

        let out = aggregator.run(&table, &[Vault::new("pSLP", "0x1")], &tag()).await;
        let vault = &out.results[0];
        assert_relative_eq!(vault.apr, 10.0, epsilon = 1e-12);
        assert_relative_eq!(vault.total_apy, compound_daily(0.1) + 3.0, epsilon = 1e-9);
        assert_eq!(out.stats.computed, 2);
        assert_eq!(out.stats.empty(), 0);
    }

    #[tokio::test]
    async fn test_override_falls_back_when_source_missing() {
        let (snapshot, aggregator, table) = setup(
            vec![VaultRoute {
                vault: "pyUSDC".into(),
                items: vec![
                    RouteItem::Reward { source: "yearn".into() },
                    RouteItem::Reward { source: "extra".into() },
                ],
                total_override: Some(TotalOverride::AprOf { source: "yearn".into() }),
            }],
            vec![pass_through("yearn", "yearn"), emission("extra", "extra")],
        );
        snapshot.set_external_yield("extra", 0.1);

        let out = aggregator.run(&table, &[Vault::new("pyUSDC", "0x1")], &tag()).await;
        let vault = &out.results[0];
        assert!(!vault.overridden);
        assert_relative_eq!(vault.total_apy, compound_daily(0.08), epsilon = 1e-9);
        assert_eq!(out.stats.unmet, 1);
    }

    #[tokio::test]
    async fn test_fee_only_vault_adds_fee_yield() {
        let (snapshot, aggregator, table) = setup(
            vec![VaultRoute {
                vault: "pUNI".into(),
                items: vec![RouteItem::Auxiliary {
                    fee_pool: "pool".into(),
                    label: LP_LABEL.to_string(),
                }],
                total_override: None,
            }],
            vec![],
        );
        snapshot.set_fee_apr("pool", 2.0);

        let out = aggregator.run(&table, &[Vault::new("pUNI", "0x1")], &tag()).await;
        let vault = &out.results[0];
        assert_eq!(vault.apys[0].get(LP_LABEL), Some(2.0));
        assert_eq!(vault.total_apy, 2.0);
        assert_eq!(vault.apr, 0.0);
    }

    #[test]
    fn test_relabelled_fee_rejected() {
        let result = RoutingTable::from_config(RoutingConfig {
            sources: vec![],
            vaults: vec![VaultRoute {
                vault: "pUNI".into(),
                items: vec![RouteItem::Auxiliary {
                    fee_pool: "pool".into(),
                    label: "fees".to_string(),
                }],
                total_override: None,
            }],
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_pass_through_without_override_rejected() {
        let result = RoutingTable::from_config(RoutingConfig {
            sources: vec![pass_through("yearn", "yearn")],
            vaults: vec![VaultRoute {
                vault: "pyUSDC".into(),
                items: vec![RouteItem::Reward { source: "yearn".into() }],
                total_override: None,
            }],
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pass_through_reported_as_is() {
        let (snapshot, aggregator, table) = setup(
            vec![VaultRoute {
                vault: "pyUSDC".into(),
                items: vec![RouteItem::Reward { source: "yearn".into() }],
                total_override: Some(TotalOverride::AprOf { source: "yearn".into() }),
            }],
            vec![pass_through("yearn", "yearn")],
        );
        snapshot.set_external_yield("yearn", 0.5);

        let out = aggregator.run(&table, &[Vault::new("pyUSDC", "0x1")], &tag()).await;
        let vault = &out.results[0];
        assert_eq!(vault.apys[0].get("yearn"), Some(50.0));
        assert_relative_eq!(vault.total_apy, 50.0, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_non_finite_yield_discarded() {
        let (snapshot, aggregator, table) = setup(
            vec![VaultRoute {
                vault: "pSLP".into(),
                items: vec![RouteItem::Reward { source: "sushi".into() }],
                total_override: None,
            }],
            vec![emission("sushi", "sushi")],
        );
        snapshot.set_external_yield("sushi", f64::NAN);

        let out = aggregator.run(&table, &[Vault::new("pSLP", "0x1")], &tag()).await;
        let vault = &out.results[0];
        assert!(vault.apys.is_empty());
        assert_eq!(vault.total_apy, 0.0);
        assert_eq!(out.stats.invalid, 1);
    }
}
