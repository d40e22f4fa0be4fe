//! Refresh triggers.
//!
//! A [`RefreshScheduler`] starts a cycle for every new block number it
//! receives and every time the price refresh interval elapses. It never waits
//! for the previous cycle: cycles overlap, and the engine's cycle board keeps
//! only the newest result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cycle::{CycleReport, Trigger};
use crate::error::{EngineError, EngineResult};
use crate::YieldEngine;

type CycleSet = JoinSet<EngineResult<Arc<CycleReport>>>;

/// Shortest timer period; `interval_at` rejects a zero period.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_REFRESH_INTERVAL {
        warn!(
            "Refresh interval {:?} below minimum, using {:?}",
            interval, MIN_REFRESH_INTERVAL
        );
        MIN_REFRESH_INTERVAL
    } else {
        interval
    }
}

/// Launches cycles on new blocks and on a timer until shutdown.
pub struct RefreshScheduler {
    engine: Arc<YieldEngine>,
    blocks: mpsc::Receiver<u64>,
    interval: Duration,
    startup_cycle: bool,
}

impl RefreshScheduler {
    /// Create a scheduler fed by `blocks`, using the engine's price refresh
    /// interval.
    pub fn new(engine: Arc<YieldEngine>, blocks: mpsc::Receiver<u64>) -> Self {
        let interval = clamp_interval(engine.config().price_refresh_interval());
        Self {
            engine,
            blocks,
            interval,
            startup_cycle: true,
        }
    }

    /// Override the timer interval, clamped to [`MIN_REFRESH_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = clamp_interval(interval);
        self
    }

    /// The timer interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Do not run a cycle when the scheduler starts.
    pub fn without_startup_cycle(mut self) -> Self {
        self.startup_cycle = false;
        self
    }

    /// Run until the engine shuts down. Returns the number of cycles launched.
    pub async fn run(mut self) -> usize {
        let mut shutdown_rx = self.engine.shutdown_signal();
        if self.engine.is_stopped() {
            return 0;
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = CycleSet::new();
        let mut launched = 0;
        let mut blocks_open = true;

        info!("Refresh scheduler started, price refresh every {:?}", self.interval);

        if self.startup_cycle {
            launch(&self.engine, &mut in_flight, Trigger::Startup);
            launched += 1;
        }

        loop {
            tokio::select! {
                block = self.blocks.recv(), if blocks_open => match block {
                    Some(number) => {
                        debug!("New block {}", number);
                        launch(&self.engine, &mut in_flight, Trigger::Block(number));
                        launched += 1;
                    }
                    None => {
                        debug!("Block stream closed, continuing on timer");
                        blocks_open = false;
                    }
                },
                _ = ticker.tick() => {
                    launch(&self.engine, &mut in_flight, Trigger::PriceRefresh);
                    launched += 1;
                }
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match done {
                        Ok(Ok(report)) => {
                            debug!(cycle = report.tag.sequence, "Cycle published");
                        }
                        Ok(Err(EngineError::StaleCycle { sequence, latest })) => {
                            debug!(cycle = sequence, "Cycle superseded by {}", latest);
                        }
                        Ok(Err(e)) => {
                            debug!("Cycle not published: {}", e);
                        }
                        Err(e) => {
                            warn!("Cycle task aborted: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Refresh scheduler shutting down");
                    break;
                }
            }
        }

        in_flight.shutdown().await;
        launched
    }

    /// Run on a background task.
    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }
}

fn launch(engine: &Arc<YieldEngine>, in_flight: &mut CycleSet, trigger: Trigger) {
    let engine = Arc::clone(engine);
    in_flight.spawn(async move { engine.run_cycle(trigger).await });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingTable;
    use harvest_config::EngineConfig;
    use harvest_ext_file::create_empty_collaborators;

    fn engine(config: EngineConfig) -> Arc<YieldEngine> {
        Arc::new(YieldEngine::new(
            config,
            create_empty_collaborators(),
            RoutingTable::empty(),
            vec![],
        ))
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let (_tx, rx) = mpsc::channel(1);
        let scheduler = RefreshScheduler::new(engine(EngineConfig::minimal()), rx)
            .with_interval(Duration::ZERO);
        assert_eq!(scheduler.interval(), MIN_REFRESH_INTERVAL);
    }

    #[test]
    fn test_unvalidated_config_interval_is_clamped() {
        let config = EngineConfig {
            price_refresh_interval_secs: 0,
            ..EngineConfig::minimal()
        };
        let (_tx, rx) = mpsc::channel(1);
        let scheduler = RefreshScheduler::new(engine(config), rx);
        assert_eq!(scheduler.interval(), MIN_REFRESH_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_ticks() {
        let engine = engine(EngineConfig::minimal());
        let mut latest = engine.subscribe();
        let (_tx, rx) = mpsc::channel(1);

        let handle = RefreshScheduler::new(engine.clone(), rx)
            .with_interval(Duration::ZERO)
            .without_startup_cycle()
            .spawn();

        latest.changed().await.unwrap();
        let report = latest.borrow().clone().unwrap();
        assert_eq!(report.tag.trigger, Trigger::PriceRefresh);

        engine.shutdown();
        assert!(handle.await.unwrap() >= 1);
    }
}
