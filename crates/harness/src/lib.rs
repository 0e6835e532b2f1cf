//! Bank consistency harness
//!
//! Drives concurrent random transfers between a fixed set of accounts
//! through any [`bank_core::Store`] and periodically checks, inside a
//! read-only snapshot, that the total balance is conserved and no account
//! has been duplicated.
//!
//! - `config`: HarnessConfig and duration parsing
//! - `setup`: drop-all, schema install and account creation
//! - `transfer`: one transfer transaction
//! - `checker`: the total balance invariant
//! - `worker` / `coordinator`: the concurrent run

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod config;
pub mod connect;
pub mod coordinator;
pub mod error;
pub mod scope;
pub mod setup;
pub mod stats;
pub mod transfer;
pub mod worker;

#[cfg(test)]
mod testing;

pub use checker::{check_total, render_accounts, TotalReport};
pub use config::{parse_duration, DurationParseError, HarnessConfig};
pub use connect::connect_all;
pub use coordinator::{Harness, RunReport};
pub use error::{HarnessError, HarnessResult, Violation};
pub use scope::TxnScope;
pub use setup::create_accounts;
pub use stats::{RunStats, StatsSnapshot};
pub use transfer::{execute_transfer, TransferOutcome, TransferRecord, MAX_AMOUNT};
pub use worker::{worker_seed, Worker, WorkerParams, WorkerSummary};
