//! Storage layer for bankstress
//!
//! This crate implements the multi-version record store behind the
//! in-process reference cluster:
//! - VersionChain: per-record version history with tombstones
//! - VersionedStorage: DashMap of chains plus a key index
//! - SnapshotView: lazy, registered point-in-time reads
//! - Version management with AtomicU64
//!
//! Writers must be serialized by the caller; readers never block them
//! beyond a DashMap shard lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod snapshot;
pub mod store;

pub use chain::{StoredRecord, VersionChain};
pub use snapshot::SnapshotView;
pub use store::{VersionedStorage, VisibleRecord};
