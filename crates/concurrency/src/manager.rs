//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by running, under one commit lock:
//! 1. Validation (first-committer-wins, write-write, phantoms)
//! 2. Storage application at `current_version + 1`
//! 3. Version publication (inside `VersionedStorage::apply`)
//!
//! Snapshots may be taken at any time without the lock; they read the last
//! published version, so they observe either all of a commit or none of it.

use bank_storage::VersionedStorage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::transaction::{CommitError, TransactionContext};
use crate::validation::validate_transaction;

/// Manages transaction lifecycle and atomic commits
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are observational only
/// and synchronize nothing.
pub struct TransactionManager {
    storage: Arc<VersionedStorage>,
    /// Serializes validate + apply
    commit_lock: Mutex<()>,
    next_txn_id: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
}

impl TransactionManager {
    /// Create a manager over `storage`
    pub fn new(storage: Arc<VersionedStorage>) -> Self {
        TransactionManager {
            storage,
            commit_lock: Mutex::new(()),
            next_txn_id: AtomicU64::new(1),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
        }
    }

    /// Storage this manager commits into
    pub fn storage(&self) -> &Arc<VersionedStorage> {
        &self.storage
    }

    /// Get current published version
    pub fn current_version(&self) -> u64 {
        self.storage.current_version()
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Start a transaction on a fresh snapshot
    pub fn begin(&self, read_only: bool) -> TransactionContext {
        let txn_id = self.next_txn_id();
        let snapshot = self.storage.snapshot();
        self.total_started.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "bank::store",
            txn_id,
            read_only,
            start_version = snapshot.version(),
            "transaction started"
        );
        TransactionContext::new(txn_id, Arc::clone(&self.storage), snapshot, read_only)
    }

    /// Commit a transaction atomically
    ///
    /// Returns the commit version. Transactions with nothing to publish
    /// commit at their snapshot version without taking the lock.
    ///
    /// # Errors
    /// - `CommitError::InvalidState` if the transaction is not active
    /// - `CommitError::ValidationFailed` if a conflict was detected; the
    ///   transaction is left `Aborted`
    pub fn commit(&self, txn: &mut TransactionContext) -> Result<u64, CommitError> {
        txn.mark_validating()?;

        if txn.is_read_only() || !txn.has_pending_writes() {
            txn.mark_committed();
            self.total_committed.fetch_add(1, Ordering::Relaxed);
            return Ok(txn.start_version);
        }

        let _guard = self.commit_lock.lock();

        let validation = validate_transaction(txn, &self.storage);
        if !validation.is_valid() {
            let reason = validation.describe();
            debug!(target: "bank::store", txn_id = txn.txn_id, %reason, "transaction aborted");
            txn.mark_aborted(reason);
            self.total_aborted.fetch_add(1, Ordering::Relaxed);
            return Err(CommitError::ValidationFailed(validation));
        }

        let commit_version = self.storage.current_version() + 1;
        let (writes, deletes) = txn.pending_writes();
        self.storage.apply(commit_version, &writes, &deletes);
        txn.mark_committed();
        self.total_committed.fetch_add(1, Ordering::Relaxed);

        debug!(
            target: "bank::store",
            txn_id = txn.txn_id,
            commit_version,
            writes = writes.len(),
            deletes = deletes.len(),
            "transaction committed"
        );
        Ok(commit_version)
    }

    /// Remove every record, serialized with commits
    pub fn drop_all(&self) -> u64 {
        let _guard = self.commit_lock.lock();
        self.storage.clear()
    }

    /// Snapshot of the manager's counters
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            total_started: self.total_started.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
        }
    }
}

/// Transaction counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions begun
    pub total_started: u64,
    /// Transactions committed
    pub total_committed: u64,
    /// Transactions aborted by validation
    pub total_aborted: u64,
}

impl TransactionMetrics {
    /// Committed / (committed + aborted), 0.0 when nothing finished
    pub fn commit_rate(&self) -> f64 {
        let finished = self.total_committed + self.total_aborted;
        if finished == 0 {
            0.0
        } else {
            self.total_committed as f64 / finished as f64
        }
    }
}
