//! Worker loop
//!
//! One worker is one logical client. Iteration `i` runs a total check when
//! `i % check_every == 0` and a transfer otherwise. Aborts are counted and
//! retried immediately. The deadline is only looked at after a successful
//! transfer, so a worker stuck in aborts keeps trying past it.

use bank_core::Store;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::checker::check_total;
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::stats::RunStats;
use crate::transfer::{execute_transfer, TransferOutcome};

/// Per-worker copy of the knobs the loop needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerParams {
    /// Number of accounts
    pub accounts: u64,
    /// Starting balance of each account
    pub starting_balance: u64,
    /// Total check period in iterations
    pub check_every: u64,
    /// Progress line period in global successes
    pub progress_every: u64,
    /// Log every transfer and abort
    pub verbose: bool,
}

impl WorkerParams {
    /// Extract worker parameters from a validated config
    pub fn from_config(config: &HarnessConfig) -> Self {
        WorkerParams {
            accounts: config.users,
            starting_balance: config.starting_balance,
            check_every: config.check_every,
            progress_every: config.progress_every,
            verbose: config.verbose,
        }
    }
}

/// What one worker did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Successful transfers
    pub successes: u64,
    /// Aborted transfers
    pub aborts: u64,
    /// Aborts the store classified as transaction conflicts
    pub conflicts: u64,
    /// Passing total checks
    pub checks: u64,
    /// True if the worker stopped because a sibling failed
    pub stopped_early: bool,
}

/// Seed for worker `index` of a run seeded with `seed`
pub fn worker_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

/// Trips the fatal latch if the worker thread unwinds
struct LatchOnPanic<'a>(&'a RunStats);

impl Drop for LatchOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.trip_fatal();
        }
    }
}

/// One logical client bound to one connection
pub struct Worker {
    id: usize,
    store: Arc<dyn Store>,
    rng: StdRng,
    params: WorkerParams,
}

impl Worker {
    /// Create worker `id` with its RNG seeded from the run seed
    pub fn new(id: usize, store: Arc<dyn Store>, params: WorkerParams, run_seed: u64) -> Self {
        Worker {
            id,
            store,
            rng: StdRng::seed_from_u64(worker_seed(run_seed, id)),
            params,
        }
    }

    /// Worker index
    pub fn id(&self) -> usize {
        self.id
    }

    /// Run until the first successful transfer after `deadline`
    ///
    /// Trips the fatal latch in `stats` before returning an error or
    /// unwinding, and returns early without error once another worker has
    /// tripped it.
    pub fn run(&mut self, stats: &RunStats, deadline: Instant) -> HarnessResult<WorkerSummary> {
        let _latch = LatchOnPanic(stats);
        debug!(
            target: "bank::harness",
            worker = self.id,
            endpoint = self.store.endpoint(),
            "worker started"
        );
        let result = self.run_loop(stats, deadline);
        match &result {
            Ok(summary) => debug!(
                target: "bank::harness",
                worker = self.id,
                successes = summary.successes,
                aborts = summary.aborts,
                checks = summary.checks,
                stopped_early = summary.stopped_early,
                "worker finished"
            ),
            Err(e) => {
                if stats.trip_fatal() {
                    warn!(target: "bank::harness", worker = self.id, error = %e, "stopping run");
                }
            }
        }
        result
    }

    fn run_loop(&mut self, stats: &RunStats, deadline: Instant) -> HarnessResult<WorkerSummary> {
        let params = self.params;
        let mut summary = WorkerSummary::default();

        for i in 0u64.. {
            if stats.is_fatal() {
                summary.stopped_early = true;
                break;
            }

            if i % params.check_every == 0 {
                check_total(self.store.as_ref(), params.accounts, params.starting_balance)?;
                stats.record_check();
                summary.checks += 1;
                continue;
            }

            let outcome = execute_transfer(self.store.as_ref(), &mut self.rng, params.accounts)?;
            match outcome {
                TransferOutcome::Aborted { reason, conflict } => {
                    stats.record_abort();
                    summary.aborts += 1;
                    if conflict {
                        summary.conflicts += 1;
                        if params.verbose {
                            debug!(target: "bank::harness", worker = self.id, %reason, "transfer aborted");
                        }
                    } else {
                        warn!(target: "bank::harness", worker = self.id, %reason, "transfer failed");
                    }
                }
                outcome => {
                    let runs = stats.record_success();
                    summary.successes += 1;
                    if params.verbose {
                        if let TransferOutcome::Committed(record) = &outcome {
                            debug!(target: "bank::harness", worker = self.id, "{}", record);
                        }
                    }
                    if runs % params.progress_every == 0 {
                        info!(target: "bank::harness", runs, aborts = stats.aborts(), "progress");
                    }
                    if Instant::now() >= deadline {
                        break;
                    }
                }
            }
        }

        Ok(summary)
    }
}
