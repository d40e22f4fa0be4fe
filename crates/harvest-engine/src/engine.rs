//! The yield engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tracing::info;

use harvest_config::{EngineConfig, RoutingConfig};
use harvest_core::Vault;
use harvest_traits::Collaborators;

use crate::aggregator::{AggregateOutput, Aggregator};
use crate::cycle::{CycleBoard, CycleReport, Trigger};
use crate::error::{EngineError, EngineResult};
use crate::routing::RoutingTable;

/// Runs refresh cycles and publishes the newest one.
///
/// Routing table and vault list are immutable snapshots: a cycle takes the
/// current ones when it starts, and replacing them never affects a cycle
/// already running.
pub struct YieldEngine {
    /// Engine configuration
    config: Arc<EngineConfig>,

    /// Fan-out / fan-in executor
    aggregator: Aggregator,

    /// Current routing table
    routing: RwLock<Arc<RoutingTable>>,

    /// Vaults refreshed by [`YieldEngine::run_cycle`]
    vaults: RwLock<Arc<Vec<Vault>>>,

    /// Cycle tags and newest report
    board: CycleBoard,

    /// Set once shutdown has been requested
    stopped: AtomicBool,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
}

impl YieldEngine {
    /// Create a new yield engine.
    pub fn new(
        config: EngineConfig,
        collaborators: Collaborators,
        routing: RoutingTable,
        vaults: Vec<Vault>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let config = Arc::new(config);

        Self {
            aggregator: Aggregator::new(collaborators, Arc::clone(&config)),
            config,
            routing: RwLock::new(Arc::new(routing)),
            vaults: RwLock::new(Arc::new(vaults)),
            board: CycleBoard::new(),
            stopped: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Run one cycle over the current vault list.
    pub async fn run_cycle(&self, trigger: Trigger) -> EngineResult<Arc<CycleReport>> {
        let vaults = self.vaults();
        self.run_cycle_with(&vaults, trigger).await
    }

    /// Run one cycle over `vaults` and publish it.
    ///
    /// Fails only with [`EngineError::StaleCycle`] when a newer cycle was
    /// published first, or [`EngineError::Shutdown`]; source failures never
    /// fail a cycle.
    pub async fn run_cycle_with(
        &self,
        vaults: &[Vault],
        trigger: Trigger,
    ) -> EngineResult<Arc<CycleReport>> {
        if self.is_stopped() {
            return Err(EngineError::Shutdown);
        }

        let tag = self.board.next_tag(trigger);
        let routing = self.routing();
        info!(
            cycle = tag.sequence,
            "Starting cycle {} ({:?}) for {} vaults",
            tag.sequence,
            trigger,
            vaults.len()
        );

        let AggregateOutput { results, stats } = self.aggregator.run(&routing, vaults, &tag).await;

        info!(
            cycle = tag.sequence,
            "Cycle {} finished in {}ms: {} tasks, {} computed, {} empty",
            tag.sequence,
            stats.elapsed_ms,
            stats.tasks,
            stats.computed,
            stats.empty()
        );

        self.board.publish(CycleReport {
            tag,
            results,
            stats,
            finished_at: Utc::now(),
        })
    }

    /// Current routing table snapshot.
    pub fn routing(&self) -> Arc<RoutingTable> {
        self.routing.read().clone()
    }

    /// Replace the routing table; running cycles keep their snapshot.
    pub fn replace_routing(&self, routing: RoutingTable) {
        info!(
            "Replacing routing table: {} sources, {} vaults",
            routing.source_count(),
            routing.vault_count()
        );
        *self.routing.write() = Arc::new(routing);
    }

    /// Validate `config` and make it the routing table.
    pub fn reload_routing(&self, config: RoutingConfig) -> EngineResult<()> {
        self.replace_routing(RoutingTable::from_config(config)?);
        Ok(())
    }

    /// Current vault list snapshot.
    pub fn vaults(&self) -> Arc<Vec<Vault>> {
        self.vaults.read().clone()
    }

    /// Replace the vault list.
    pub fn set_vaults(&self, vaults: Vec<Vault>) {
        *self.vaults.write() = Arc::new(vaults);
    }

    /// Watch the newest published cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CycleReport>>> {
        self.board.subscribe()
    }

    /// The newest published cycle.
    pub fn latest(&self) -> Option<Arc<CycleReport>> {
        self.board.latest()
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receiver for the shutdown signal.
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Returns true once shutdown has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop accepting cycles and signal schedulers.
    pub fn shutdown(&self) {
        info!("Shutting down yield engine");
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for YieldEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YieldEngine")
            .field("config", &self.config)
            .field("latest_cycle", &self.board.latest_sequence())
            .finish_non_exhaustive()
    }
}
