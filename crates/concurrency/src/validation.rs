//! Transaction validation for OCC
//!
//! Rules:
//! - First-committer-wins on the read set: a record read at version V
//!   conflicts if its newest version is no longer V
//! - Write-write: a record updated or deleted conflicts if anyone committed
//!   to it after the transaction's snapshot
//! - Phantoms: a predicate read on an upsert-protected predicate conflicts
//!   if the set of matching records changed since the snapshot
//! - Read-only transactions always validate
//!
//! Validation must run under the manager's commit lock so that storage
//! cannot move between validation and apply.

use bank_core::{Predicate, Uid};
use bank_storage::VersionedStorage;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::transaction::{PredicateRead, TransactionContext};

/// Types of conflicts found during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// A record read by the transaction has been rewritten since
    ReadWriteConflict {
        /// Record
        uid: Uid,
        /// Version recorded in the read set
        read_version: u64,
        /// Newest version in storage at validation time
        current_version: u64,
    },

    /// A record the transaction writes was committed to after its snapshot
    WriteWriteConflict {
        /// Record
        uid: Uid,
        /// Snapshot version of the transaction
        start_version: u64,
        /// Newest version in storage at validation time
        current_version: u64,
    },

    /// The set of records matching a protected predicate changed
    PhantomConflict {
        /// The query whose result set changed
        predicate: Predicate,
        /// Uids matching at the snapshot
        observed: BTreeSet<Uid>,
        /// Uids matching now
        current: BTreeSet<Uid>,
    },
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::ReadWriteConflict {
                uid,
                read_version,
                current_version,
            } => write!(
                f,
                "read-write conflict on {} (read v{}, now v{})",
                uid, read_version, current_version
            ),
            ConflictType::WriteWriteConflict {
                uid,
                start_version,
                current_version,
            } => write!(
                f,
                "write-write conflict on {} (snapshot v{}, now v{})",
                uid, start_version, current_version
            ),
            ConflictType::PhantomConflict {
                predicate,
                observed,
                current,
            } => write!(
                f,
                "phantom on {}: {} record(s) at snapshot, {} now",
                predicate.field(),
                observed.len(),
                current.len()
            ),
        }
    }
}

/// Result of transaction validation
///
/// A transaction commits only if `is_valid()` returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Successful validation result
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// One-line summary naming the first conflict
    pub fn describe(&self) -> String {
        match self.conflicts.first() {
            None => "no conflicts".to_string(),
            Some(first) if self.conflicts.len() == 1 => first.to_string(),
            Some(first) => format!("{} (+{} more)", first, self.conflicts.len() - 1),
        }
    }
}

/// Validate the read set against the newest committed versions
pub fn validate_read_set(read_set: &HashMap<Uid, u64>, storage: &VersionedStorage) -> ValidationResult {
    let mut result = ValidationResult::ok();
    for (uid, read_version) in read_set {
        let current_version = storage.latest_version(*uid);
        if current_version != *read_version {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                uid: *uid,
                read_version: *read_version,
                current_version,
            });
        }
    }
    result
}

/// Validate updates and deletes of pre-existing records
///
/// Records created by this transaction cannot conflict: their uids were
/// allocated privately.
pub fn validate_write_set(txn: &TransactionContext, storage: &VersionedStorage) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let targets = txn
        .write_set
        .keys()
        .filter(|uid| !txn.created.contains(uid))
        .chain(txn.delete_set.iter());
    for uid in targets {
        let current_version = storage.latest_version(*uid);
        if current_version > txn.start_version {
            result.conflicts.push(ConflictType::WriteWriteConflict {
                uid: *uid,
                start_version: txn.start_version,
                current_version,
            });
        }
    }
    result
}

/// Re-run protected predicate reads against the newest version
pub fn validate_predicate_reads(
    reads: &[PredicateRead],
    storage: &VersionedStorage,
) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let version = storage.current_version();
    for read in reads.iter().filter(|r| r.phantom_protected) {
        let current: BTreeSet<Uid> = storage
            .scan_at(&read.predicate, version)
            .into_iter()
            .map(|r| r.uid)
            .collect();
        if current != read.observed {
            result.conflicts.push(ConflictType::PhantomConflict {
                predicate: read.predicate.clone(),
                observed: read.observed.clone(),
                current,
            });
        }
    }
    result
}

/// Validate a complete transaction against current storage state
///
/// Read-only transactions, and transactions that buffered nothing, skip
/// validation entirely: they publish nothing, so their snapshot is a
/// valid serialization point.
pub fn validate_transaction(txn: &TransactionContext, storage: &VersionedStorage) -> ValidationResult {
    if txn.is_read_only() || !txn.has_pending_writes() {
        return ValidationResult::ok();
    }

    let mut result = ValidationResult::ok();
    result.merge(validate_read_set(&txn.read_set, storage));
    result.merge(validate_write_set(txn, storage));
    result.merge(validate_predicate_reads(&txn.predicate_reads, storage));
    result
}
