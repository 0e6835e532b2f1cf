//! bankstress - concurrent bank-transfer consistency harness
//!
//! Moves money between a fixed set of accounts from many concurrent
//! transactions and checks, from a read-only snapshot, that no money is
//! created or destroyed and no account is duplicated. Any store that
//! implements [`Store`] can be tested; [`MemoryCluster`] is the built-in
//! in-process OCC store.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use bankstress::{Harness, HarnessConfig, MemoryCluster};
//!
//! let config = HarnessConfig {
//!     users: 5,
//!     dur: "10s".to_string(),
//!     login: false,
//!     ..HarnessConfig::default()
//! };
//! let cluster = MemoryCluster::new(config.endpoints());
//! let report = Harness::new(config, Arc::new(cluster)).run()?;
//! println!("{}", report);
//! ```

pub use bank_concurrency::{MemoryCluster, TransactionManager, TransactionMetrics};
pub use bank_core::{
    Account, Connector, Credentials, Mutation, Operation, Predicate, RunId, Schema, Store,
    StoreError, StoreResult, Transaction, Uid,
};
pub use bank_harness::{
    check_total, create_accounts, execute_transfer, Harness, HarnessConfig, HarnessError,
    HarnessResult, RunReport, TotalReport, TransferOutcome, Violation,
};
pub use bank_storage::VersionedStorage;
