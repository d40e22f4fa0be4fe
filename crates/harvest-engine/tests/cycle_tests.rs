//! Integration tests for cycle ordering and refresh triggers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use harvest_config::EngineConfig;
use harvest_engine::{EngineError, RefreshScheduler, Trigger, YieldEngine};
use harvest_traits::ContractReader;

use common::*;

fn shared_engine() -> Arc<YieldEngine> {
    Arc::new(engine(collaborators(&snapshot(), None), EngineConfig::minimal()))
}

#[tokio::test(start_paused = true)]
async fn test_late_older_cycle_is_discarded() {
    init_tracing();
    let snapshot = snapshot();
    let inner: Arc<dyn ContractReader> = snapshot.clone();
    let slow = FaultyReader::new(inner, MIC_REWARDS, Fault::Stall(Duration::from_secs(5)));
    let config = EngineConfig {
        source_timeout_ms: 60_000,
        ..EngineConfig::minimal()
    };
    let engine = engine(collaborators(&snapshot, Some(slow)), config);

    let all = vaults();
    let quick: Vec<_> = all
        .iter()
        .filter(|v| v.name.as_str() != "pSLP MIC/USDT")
        .cloned()
        .collect();

    // the first future polled takes the first tag
    let (older, newer) = tokio::join!(
        engine.run_cycle_with(&all, Trigger::Block(1)),
        engine.run_cycle_with(&quick, Trigger::Block(2)),
    );

    let newer = newer.unwrap();
    assert_eq!(newer.tag.sequence, 2);
    assert!(matches!(
        older,
        Err(EngineError::StaleCycle {
            sequence: 1,
            latest: 2
        })
    ));

    let latest = engine.latest().unwrap();
    assert_eq!(latest.tag.trigger, Trigger::Block(2));
    assert!(latest.get(&"pSLP MIC/USDT".into()).is_none());
}

#[tokio::test]
async fn test_subscribers_see_newest_cycle() {
    let engine = shared_engine();
    let mut rx = engine.subscribe();

    engine.run_cycle(Trigger::Manual).await.unwrap();
    engine.run_cycle(Trigger::Block(7)).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone().unwrap();
    assert_eq!(seen.tag.sequence, 2);
    assert_eq!(seen.tag.trigger, Trigger::Block(7));
    assert_eq!(seen.results.len(), vaults().len());
}

#[tokio::test]
async fn test_routing_swap_applies_to_next_cycle() -> anyhow::Result<()> {
    let engine = shared_engine();
    let first = engine.run_cycle(Trigger::Manual).await?;
    assert!(first.get(&"pSLP A".into()).unwrap().total_apy > 0.0);

    let mut routing = routing();
    routing.vaults.retain(|r| r.vault.as_str() != "pSLP A");
    engine.reload_routing(routing)?;

    let second = engine.run_cycle(Trigger::Manual).await?;
    assert_eq!(second.get(&"pSLP A".into()).unwrap().total_apy, 0.0);
    assert_eq!(second.get(&"pSLP B".into()), first.get(&"pSLP B".into()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_startup_cycle() {
    let engine = shared_engine();
    let mut rx = engine.subscribe();
    let (_blocks_tx, blocks_rx) = mpsc::channel(8);

    let handle = RefreshScheduler::new(engine.clone(), blocks_rx)
        .with_interval(Duration::from_secs(3600))
        .spawn();

    rx.changed().await.unwrap();
    let report = rx.borrow().clone().unwrap();
    assert_eq!(report.tag.trigger, Trigger::Startup);

    engine.shutdown();
    assert!(handle.await.unwrap() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_cycle_per_block() {
    let engine = shared_engine();
    let mut rx = engine.subscribe();
    let (blocks_tx, blocks_rx) = mpsc::channel(8);

    let handle = RefreshScheduler::new(engine.clone(), blocks_rx)
        .with_interval(Duration::from_secs(3600))
        .without_startup_cycle()
        .spawn();

    blocks_tx.send(12_000_001).await.unwrap();
    rx.changed().await.unwrap();
    let report = rx.borrow().clone().unwrap();
    assert_eq!(report.tag.trigger, Trigger::Block(12_000_001));

    engine.shutdown();
    assert!(handle.await.unwrap() >= 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_refreshes_on_timer() {
    let engine = shared_engine();
    let mut rx = engine.subscribe();
    let (blocks_tx, blocks_rx) = mpsc::channel(8);
    // a closed block stream leaves the timer running
    drop(blocks_tx);

    let handle = RefreshScheduler::new(engine.clone(), blocks_rx)
        .with_interval(Duration::from_secs(120))
        .without_startup_cycle()
        .spawn();

    rx.changed().await.unwrap();
    let report = rx.borrow().clone().unwrap();
    assert_eq!(report.tag.trigger, Trigger::PriceRefresh);

    engine.shutdown();
    assert!(handle.await.unwrap() >= 1);
}

#[tokio::test]
async fn test_scheduler_after_shutdown_launches_nothing() {
    let engine = shared_engine();
    engine.shutdown();
    let (_blocks_tx, blocks_rx) = mpsc::channel(8);

    let launched = RefreshScheduler::new(engine.clone(), blocks_rx).run().await;
    assert_eq!(launched, 0);
    assert!(engine.latest().is_none());
}
