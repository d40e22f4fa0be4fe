//! Refresh cycles: tags, reports and the publication board.
//!
//! Every cycle is tagged with a monotonically increasing sequence number
//! when it starts. Cycles may finish out of order; the [`CycleBoard`] only
//! accepts a report newer than the one it already holds, so a slow cycle can
//! never overwrite the results of a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use harvest_core::{VaultId, VaultYield};

use crate::aggregator::CycleStats;
use crate::error::{EngineError, EngineResult};

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "block", rename_all = "snake_case")]
pub enum Trigger {
    /// First cycle after start
    Startup,
    /// Requested by a caller
    Manual,
    /// A new block was observed
    Block(u64),
    /// The price refresh interval elapsed
    PriceRefresh,
}

/// Identity of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTag {
    /// Monotonically increasing sequence number
    pub sequence: u64,
    /// What started the cycle
    pub trigger: Trigger,
    /// Start time
    pub started_at: DateTime<Utc>,
}

/// Output of one finished cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Cycle identity
    pub tag: CycleTag,
    /// One record per input vault, in input order
    pub results: Vec<VaultYield>,
    /// Execution statistics
    pub stats: CycleStats,
    /// Completion time
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    /// Result of `vault`, if it was part of the cycle.
    pub fn get(&self, vault: &VaultId) -> Option<&VaultYield> {
        self.results.iter().find(|r| &r.vault == vault)
    }
}

/// Hands out cycle tags and publishes the newest finished cycle.
#[derive(Debug)]
pub struct CycleBoard {
    next_sequence: AtomicU64,
    latest: watch::Sender<Option<Arc<CycleReport>>>,
}

impl CycleBoard {
    /// Create an empty board; the first tag has sequence 1.
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            next_sequence: AtomicU64::new(1),
            latest,
        }
    }

    /// Tag a new cycle.
    pub fn next_tag(&self, trigger: Trigger) -> CycleTag {
        CycleTag {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            trigger,
            started_at: Utc::now(),
        }
    }

    /// Publish `report` if it is newer than the current one.
    ///
    /// Returns [`EngineError::StaleCycle`] and leaves the board unchanged
    /// otherwise.
    pub fn publish(&self, report: CycleReport) -> EngineResult<Arc<CycleReport>> {
        let report = Arc::new(report);
        let sequence = report.tag.sequence;
        let mut latest = 0;

        let accepted = self.latest.send_if_modified(|current| {
            latest = current.as_ref().map_or(0, |r| r.tag.sequence);
            if sequence > latest {
                *current = Some(Arc::clone(&report));
                true
            } else {
                false
            }
        });

        if accepted {
            Ok(report)
        } else {
            warn!(cycle = sequence, latest, "discarding stale cycle");
            Err(EngineError::StaleCycle { sequence, latest })
        }
    }

    /// Watch the newest published report.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CycleReport>>> {
        self.latest.subscribe()
    }

    /// The newest published report.
    pub fn latest(&self) -> Option<Arc<CycleReport>> {
        self.latest.borrow().clone()
    }

    /// Sequence of the newest published report, 0 if none.
    pub fn latest_sequence(&self) -> u64 {
        self.latest.borrow().as_ref().map_or(0, |r| r.tag.sequence)
    }
}

impl Default for CycleBoard {
    fn default() -> Self {
        Self::new()
    }
}
