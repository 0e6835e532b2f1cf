//! Harness coordinator
//!
//! Connects to every endpoint, initializes the bank, runs
//! `txns × endpoints` workers on scoped threads until the deadline,
//! aggregates their counters and finishes with one last total check.

use bank_core::{Connector, RunId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{error, info};

use crate::checker::check_total;
use crate::config::HarnessConfig;
use crate::connect::connect_all;
use crate::error::{HarnessError, HarnessResult};
use crate::setup::create_accounts;
use crate::stats::RunStats;
use crate::worker::{Worker, WorkerParams, WorkerSummary};

/// Summary of a run that passed every check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// Wall-clock start of the transfer phase
    pub started_at: DateTime<Utc>,
    /// Seconds from first worker start to last worker exit
    pub elapsed_secs: f64,
    /// Seed the worker RNGs were derived from
    pub seed: u64,
    /// Number of endpoints dialled
    pub endpoints: usize,
    /// Number of workers run
    pub workers: usize,
    /// Successful transfers
    pub successes: u64,
    /// Aborted transfers
    pub aborts: u64,
    /// Passing total checks, the final one included
    pub checks: u64,
    /// Total balance at the final check
    pub final_total: u64,
    /// Materialized accounts at the final check
    pub materialized: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Runs: {}. Aborts: {}. Checks: {}. Total: {} across {} account(s). {} worker(s), {:.1}s. PASS",
            self.successes,
            self.aborts,
            self.checks,
            self.final_total,
            self.materialized,
            self.workers,
            self.elapsed_secs
        )
    }
}

/// Runs the bank workload against a store cluster
pub struct Harness {
    config: HarnessConfig,
    connector: Arc<dyn Connector>,
    run_id: RunId,
}

impl Harness {
    /// Create a harness; the config is validated when the run starts
    pub fn new(config: HarnessConfig, connector: Arc<dyn Connector>) -> Self {
        Harness {
            config,
            connector,
            run_id: RunId::new(),
        }
    }

    /// Identifier tagged on this run's logs and report
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Configuration in use
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Execute the full run
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: invalid config, setup failure, a
    /// violation seen by any worker or by the final check, or a panicked
    /// worker.
    pub fn run(&self) -> HarnessResult<RunReport> {
        let config = &self.config;
        config.validate()?;
        let duration = config.duration()?;
        let endpoints = config.endpoints();
        let credentials = config.credentials();

        let stores = connect_all(self.connector.as_ref(), &endpoints, credentials.as_ref())?;
        let primary = stores
            .first()
            .ok_or_else(|| HarnessError::config("alpha must name at least one endpoint"))?;
        create_accounts(
            primary.as_ref(),
            config.users,
            config.starting_balance,
            config.verbose,
        )?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let params = WorkerParams::from_config(config);
        let worker_count = config.txns * stores.len();
        let stats = RunStats::new();
        info!(
            target: "bank::harness",
            run_id = %self.run_id,
            seed,
            workers = worker_count,
            endpoints = stores.len(),
            duration = %config.dur,
            "starting transfers"
        );

        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = start + duration;

        let results: Vec<HarnessResult<WorkerSummary>> = thread::scope(|s| {
            let handles: Vec<_> = (0..worker_count)
                .map(|id| {
                    let store = Arc::clone(&stores[id % stores.len()]);
                    let mut worker = Worker::new(id, store, params, seed);
                    let stats = &stats;
                    s.spawn(move || worker.run(stats, deadline))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        stats.trip_fatal();
                        Err(HarnessError::WorkerPanicked { worker: id })
                    })
                })
                .collect()
        });
        let elapsed = start.elapsed();

        if let Some(err) = first_error(results) {
            error!(target: "bank::harness", run_id = %self.run_id, error = %err, "run failed");
            return Err(err);
        }

        let report = check_total(primary.as_ref(), config.users, config.starting_balance)?;
        stats.record_check();
        let counters = stats.snapshot();

        let run = RunReport {
            run_id: self.run_id,
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            seed,
            endpoints: stores.len(),
            workers: worker_count,
            successes: counters.successes,
            aborts: counters.aborts,
            checks: counters.checks,
            final_total: report.total,
            materialized: report.materialized,
        };
        info!(
            target: "bank::harness",
            run_id = %self.run_id,
            runs = run.successes,
            aborts = run.aborts,
            checks = run.checks,
            total = run.final_total,
            "run passed"
        );
        Ok(run)
    }
}

/// First error, preferring a violation over the errors it caused
fn first_error(results: Vec<HarnessResult<WorkerSummary>>) -> Option<HarnessError> {
    let mut errors: Vec<HarnessError> = results.into_iter().filter_map(Result::err).collect();
    match errors.iter().position(|e| e.violation().is_some()) {
        Some(index) => Some(errors.swap_remove(index)),
        None => errors.into_iter().next(),
    }
}
