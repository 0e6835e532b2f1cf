//! Shared run statistics
//!
//! The only mutable state workers share: success/abort/check counters and a
//! fatal latch. Counters use Relaxed ordering; they are tallies and order
//! nothing else. The latch uses Release/Acquire so a worker that sees it
//! also sees whatever the failing worker logged before tripping it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters shared by every worker of a run
#[derive(Debug, Default)]
pub struct RunStats {
    successes: AtomicU64,
    aborts: AtomicU64,
    checks: AtomicU64,
    fatal: AtomicBool,
}

impl RunStats {
    /// Fresh counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a successful transfer, returning the new total
    pub fn record_success(&self) -> u64 {
        self.successes.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count an aborted transfer, returning the new total
    pub fn record_abort(&self) -> u64 {
        self.aborts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a passing total check
    pub fn record_check(&self) -> u64 {
        self.checks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Successful transfers so far
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Aborted transfers so far
    pub fn aborts(&self) -> u64 {
        self.aborts.load(Ordering::Relaxed)
    }

    /// Passing total checks so far
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    /// Trip the fatal latch; true for the first caller only
    pub fn trip_fatal(&self) -> bool {
        !self.fatal.swap(true, Ordering::AcqRel)
    }

    /// True once any worker has failed
    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::Acquire)
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            successes: self.successes(),
            aborts: self.aborts(),
            checks: self.checks(),
        }
    }
}

/// Plain copy of [`RunStats`] counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Successful transfers
    pub successes: u64,
    /// Aborted transfers
    pub aborts: u64,
    /// Passing total checks
    pub checks: u64,
}

impl StatsSnapshot {
    /// Fraction of transfer attempts that aborted
    pub fn abort_rate(&self) -> f64 {
        let attempts = self.successes + self.aborts;
        if attempts == 0 {
            0.0
        } else {
            self.aborts as f64 / attempts as f64
        }
    }
}
