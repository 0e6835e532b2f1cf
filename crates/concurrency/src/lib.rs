//! Concurrency layer for bankstress
//!
//! This crate implements optimistic concurrency control (OCC) over
//! `bank-storage` and exposes it through the store traits of `bank-core`:
//! - TransactionContext: read/write set and predicate-read tracking
//! - Snapshot isolation through registered storage snapshots
//! - Conflict detection at commit time (read-write, write-write, phantom)
//! - MemoryCluster: an in-process multi-endpoint store

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use cluster::{MemoryCluster, MemoryConnection, MemoryTxn};
pub use manager::{TransactionManager, TransactionMetrics};
pub use transaction::{CommitError, PredicateRead, TransactionContext, TransactionStatus};
pub use validation::{validate_transaction, ConflictType, ValidationResult};
