//! Version chains for MVCC
//!
//! Each record reference owns a chain of versions stored newest-first.
//! Deletes push a tombstone rather than removing the chain, so snapshots
//! older than the delete still see the record.

use bank_core::Account;
use std::collections::VecDeque;

/// One version of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    version: u64,
    value: Option<Account>,
}

impl StoredRecord {
    /// Live value written at `version`
    pub fn live(version: u64, account: Account) -> Self {
        StoredRecord {
            version,
            value: Some(account),
        }
    }

    /// Tombstone written at `version`
    pub fn tombstone(version: u64) -> Self {
        StoredRecord {
            version,
            value: None,
        }
    }

    /// Commit version of this entry
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record value, `None` for a tombstone
    #[inline]
    pub fn value(&self) -> Option<&Account> {
        self.value.as_ref()
    }

    /// True if this entry marks a delete
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Version chain, newest first
///
/// Uses VecDeque for O(1) push_front: hot accounts are rewritten on almost
/// every commit.
#[derive(Debug, Clone)]
pub struct VersionChain {
    versions: VecDeque<StoredRecord>,
}

impl VersionChain {
    /// Create a chain holding a single version
    pub fn new(record: StoredRecord) -> Self {
        let mut versions = VecDeque::with_capacity(4);
        versions.push_front(record);
        Self { versions }
    }

    /// Add a new version (must be newer than every existing version)
    #[inline]
    pub fn push(&mut self, record: StoredRecord) {
        debug_assert!(
            self.versions
                .front()
                .map_or(true, |latest| latest.version < record.version),
            "versions must be pushed in increasing order"
        );
        self.versions.push_front(record);
    }

    /// Entry visible at `max_version` (tombstones included)
    pub fn get_at_version(&self, max_version: u64) -> Option<&StoredRecord> {
        self.versions.iter().find(|r| r.version <= max_version)
    }

    /// Latest entry
    #[inline]
    pub fn latest(&self) -> Option<&StoredRecord> {
        self.versions.front()
    }

    /// Drop versions no snapshot at or above `min_version` can observe
    ///
    /// Keeps the newest entry at or below `min_version` plus everything newer.
    pub fn gc(&mut self, min_version: u64) {
        while self.versions.len() > 1 {
            let second_oldest = &self.versions[self.versions.len() - 2];
            if second_oldest.version <= min_version {
                self.versions.pop_back();
            } else {
                break;
            }
        }
    }

    /// Number of versions stored
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// True if the chain holds nothing
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
