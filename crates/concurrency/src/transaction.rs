//! Transaction context for OCC
//!
//! TransactionContext tracks everything a transaction observed and buffered:
//! point versions it read, the predicate reads it made, and the writes and
//! deletes it will publish at commit. Nothing reaches storage until the
//! manager validates the context under its commit lock.

use bank_core::{Account, Assigned, Mutation, Predicate, StoreError, StoreResult, Uid};
use bank_storage::{SnapshotView, VersionedStorage};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::validation::ValidationResult;

/// Error type for commit failures
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// Transaction aborted due to validation conflicts
    #[error("commit failed: {}", .0.describe())]
    ValidationFailed(ValidationResult),

    /// Transaction was not in a state that allows commit
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<CommitError> for StoreError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => StoreError::conflict(result.describe()),
            CommitError::InvalidState(msg) => StoreError::internal(msg),
        }
    }
}

/// Status of a transaction
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Discarded` (caller gave up)
///
/// `Committed`, `Aborted` and `Discarded` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction lost validation
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
    /// Transaction was discarded before commit
    Discarded,
}

/// A predicate query made through the transaction's snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateRead {
    /// The query
    pub predicate: Predicate,
    /// Uids the snapshot returned
    pub observed: BTreeSet<Uid>,
    /// Whether a change in the matching set must abort the transaction
    pub phantom_protected: bool,
}

/// Transaction context for OCC
///
/// # Lifecycle
///
/// 1. **BEGIN**: created by the manager with a registered snapshot
/// 2. **READ/WRITE**: `query()`, `mutate()`
/// 3. **VALIDATE/COMMIT**: `TransactionManager::commit`
/// 4. **DISCARD**: `discard()` on any exit path, idempotent
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: u64,

    /// Version at transaction start (snapshot version)
    pub start_version: u64,

    read_only: bool,

    /// Released as soon as the transaction reaches a terminal state
    snapshot: Option<SnapshotView>,

    storage: Arc<VersionedStorage>,

    /// Uids read from the snapshot and the version each was read at
    pub read_set: HashMap<Uid, u64>,

    /// Predicate queries made from the snapshot
    pub predicate_reads: Vec<PredicateRead>,

    /// Buffered creates and updates, keyed by target uid
    pub write_set: BTreeMap<Uid, Account>,

    /// Uids allocated by this transaction's creates
    pub created: BTreeSet<Uid>,

    /// Buffered deletes of records that existed before this transaction
    pub delete_set: BTreeSet<Uid>,

    /// Current transaction status
    pub status: TransactionStatus,

    start_time: Instant,
}

impl TransactionContext {
    /// Create a transaction reading from `snapshot`
    pub fn new(
        txn_id: u64,
        storage: Arc<VersionedStorage>,
        snapshot: SnapshotView,
        read_only: bool,
    ) -> Self {
        TransactionContext {
            txn_id,
            start_version: snapshot.version(),
            read_only,
            snapshot: Some(snapshot),
            storage,
            read_set: HashMap::new(),
            predicate_reads: Vec::new(),
            write_set: BTreeMap::new(),
            created: BTreeSet::new(),
            delete_set: BTreeSet::new(),
            status: TransactionStatus::Active,
            start_time: Instant::now(),
        }
    }

    // === Read Operations ===

    /// Run a predicate query
    ///
    /// Implements read-your-writes: buffered writes replace or add to the
    /// snapshot result and buffered deletes hide records. Only snapshot
    /// reads are tracked for validation, and only in read-write
    /// transactions.
    ///
    /// Results are ordered by uid.
    pub fn query(
        &mut self,
        predicate: &Predicate,
        phantom_protected: bool,
    ) -> StoreResult<Vec<Account>> {
        self.ensure_active()?;
        let snapshot = self.snapshot.as_ref().ok_or_else(|| {
            StoreError::internal(format!("transaction {} has no snapshot", self.txn_id))
        })?;

        let track = !self.read_only;
        let mut observed = BTreeSet::new();
        let mut results: BTreeMap<Uid, Account> = BTreeMap::new();

        for record in snapshot.scan(predicate) {
            if track {
                self.read_set.insert(record.uid, record.version);
                observed.insert(record.uid);
            }
            if self.delete_set.contains(&record.uid) || self.write_set.contains_key(&record.uid) {
                continue;
            }
            results.insert(record.uid, record.account);
        }

        for (uid, account) in &self.write_set {
            if predicate.matches(account) {
                results.insert(*uid, account.clone());
            }
        }

        if track {
            self.predicate_reads.push(PredicateRead {
                predicate: predicate.clone(),
                observed,
                phantom_protected,
            });
        }

        Ok(results.into_values().collect())
    }

    // === Write Operations ===

    /// Buffer a mutation
    ///
    /// `set` entries without a uid create a record: a fresh uid is
    /// allocated now and returned under the record's blank label. Deleting
    /// a record this transaction created simply forgets the create.
    ///
    /// # Errors
    /// - `ReadOnly` in a read-only transaction
    /// - `TxnFinished` if the transaction is no longer active
    /// - `InvalidMutation` for a delete without a uid or a record without a kind
    pub fn mutate(&mut self, mutation: &Mutation) -> StoreResult<Assigned> {
        self.ensure_active()?;
        if self.read_only {
            return Err(StoreError::ReadOnly {
                txn_id: self.txn_id,
            });
        }
        for account in &mutation.set {
            if account.typ.is_empty() {
                return Err(StoreError::invalid_mutation(format!(
                    "record {} has no kind",
                    account.blank_label()
                )));
            }
        }
        if let Some(account) = mutation.delete.iter().find(|a| a.uid.is_none()) {
            return Err(StoreError::invalid_mutation(format!(
                "delete of {} without a uid",
                account.blank_label()
            )));
        }

        let mut assigned = Assigned::default();
        for account in &mutation.set {
            let mut account = account.clone();
            let uid = match account.uid {
                Some(uid) => uid,
                None => {
                    let uid = self.storage.allocate_uid();
                    self.created.insert(uid);
                    assigned.uids.insert(account.blank_label(), uid);
                    uid
                }
            };
            account.uid = Some(uid);
            self.delete_set.remove(&uid);
            self.write_set.insert(uid, account);
        }

        for uid in mutation.delete.iter().filter_map(|a| a.uid) {
            self.write_set.remove(&uid);
            if !self.created.remove(&uid) {
                self.delete_set.insert(uid);
            }
        }

        Ok(assigned)
    }

    // === State ===

    /// Check if transaction is active
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Check if transaction was aborted by validation
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// True if the transaction was opened read-only
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True if commit would publish anything
    pub fn has_pending_writes(&self) -> bool {
        !self.write_set.is_empty() || !self.delete_set.is_empty()
    }

    /// Abort reason, if aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// Time since the transaction began
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check the transaction can accept operations
    ///
    /// # Errors
    /// Returns `TxnFinished` if the transaction reached a terminal state.
    pub fn ensure_active(&self) -> StoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreError::TxnFinished {
                txn_id: self.txn_id,
            })
        }
    }

    /// Transition `Active` → `Validating`
    pub fn mark_validating(&mut self) -> Result<(), CommitError> {
        if !self.is_active() {
            return Err(CommitError::InvalidState(format!(
                "cannot commit transaction {} from {:?}",
                self.txn_id, self.status
            )));
        }
        self.status = TransactionStatus::Validating;
        Ok(())
    }

    /// Transition to `Committed` and release the snapshot
    pub fn mark_committed(&mut self) {
        self.status = TransactionStatus::Committed;
        self.finish();
    }

    /// Transition to `Aborted`, dropping buffered writes and the snapshot
    ///
    /// The read set is kept for diagnostics.
    pub fn mark_aborted(&mut self, reason: String) {
        self.status = TransactionStatus::Aborted { reason };
        self.write_set.clear();
        self.created.clear();
        self.delete_set.clear();
        self.finish();
    }

    /// Discard the transaction
    ///
    /// No-op on a transaction that already finished.
    pub fn discard(&mut self) {
        if self.is_active() {
            self.status = TransactionStatus::Discarded;
            self.write_set.clear();
            self.created.clear();
            self.delete_set.clear();
            self.finish();
        }
    }

    /// Buffered writes and deletes in the form storage applies them
    pub fn pending_writes(&self) -> (Vec<(Uid, Account)>, Vec<Uid>) {
        let writes = self
            .write_set
            .iter()
            .map(|(uid, account)| (*uid, account.clone()))
            .collect();
        let deletes = self.delete_set.iter().copied().collect();
        (writes, deletes)
    }

    fn finish(&mut self) {
        self.snapshot = None;
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("read_only", &self.read_only)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .field("deletes", &self.delete_set.len())
            .field("status", &self.status)
            .finish()
    }
}
