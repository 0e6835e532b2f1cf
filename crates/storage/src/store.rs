//! Versioned record storage
//!
//! DashMap of version chains keyed by record uid, plus a secondary index
//! from account key to every uid that has ever carried that key.
//!
//! # Design
//!
//! - DashMap: sharded, reads only take a shard read lock
//! - Key index: FxHashSet per key, append-only until the record is vacuumed
//! - Global version: published with Release after a batch is fully applied,
//!   so a snapshot taken at version V never observes half of commit V+1
//!
//! # Thread Safety
//!
//! Reads (`get_at`, `scan_at`) may run concurrently with everything.
//! Writers (`apply`, `clear`) must be serialized by the caller; the
//! concurrency layer holds its commit lock around them.

use bank_core::{Account, Predicate, Uid};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::chain::{StoredRecord, VersionChain};
use crate::snapshot::SnapshotView;

/// A record visible at some version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleRecord {
    /// Record reference
    pub uid: Uid,
    /// Commit version that wrote the visible value
    pub version: u64,
    /// The record, with `uid` filled in
    pub account: Account,
}

/// Multi-version record storage
pub struct VersionedStorage {
    records: DashMap<Uid, VersionChain>,
    key_index: DashMap<u64, FxHashSet<Uid>>,
    /// Pending tombstones (version, uid, key), oldest first
    tombstones: Mutex<VecDeque<(u64, Uid, u64)>>,
    /// Active snapshot versions → reference count
    snapshots: Mutex<BTreeMap<u64, usize>>,
    next_uid: AtomicU64,
    version: AtomicU64,
}

impl VersionedStorage {
    /// Create an empty store at version 0
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            key_index: DashMap::new(),
            tombstones: Mutex::new(VecDeque::new()),
            snapshots: Mutex::new(BTreeMap::new()),
            next_uid: AtomicU64::new(1),
            version: AtomicU64::new(0),
        }
    }

    /// Last published commit version
    #[inline]
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Allocate a fresh record reference
    pub fn allocate_uid(&self) -> Uid {
        Uid::new(self.next_uid.fetch_add(1, Ordering::SeqCst))
    }

    /// Live value of `uid` as of `max_version`
    pub fn get_at(&self, uid: Uid, max_version: u64) -> Option<VisibleRecord> {
        let chain = self.records.get(&uid)?;
        let entry = chain.get_at_version(max_version)?;
        entry.value().map(|account| VisibleRecord {
            uid,
            version: entry.version(),
            account: with_uid(account, uid),
        })
    }

    /// Version of the entry visible at `max_version`, tombstones included
    ///
    /// Returns 0 if nothing about `uid` is visible.
    pub fn visible_version(&self, uid: Uid, max_version: u64) -> u64 {
        self.records
            .get(&uid)
            .and_then(|chain| chain.get_at_version(max_version).map(StoredRecord::version))
            .unwrap_or(0)
    }

    /// Version of the newest entry for `uid`, tombstones included
    ///
    /// Returns 0 if the store holds nothing for `uid`.
    pub fn latest_version(&self, uid: Uid) -> u64 {
        self.records
            .get(&uid)
            .and_then(|chain| chain.latest().map(StoredRecord::version))
            .unwrap_or(0)
    }

    /// Every live record matching `predicate` as of `max_version`, sorted by uid
    pub fn scan_at(&self, predicate: &Predicate, max_version: u64) -> Vec<VisibleRecord> {
        let mut results: Vec<VisibleRecord> = match predicate {
            Predicate::KeyEq(key) => {
                let uids: Vec<Uid> = self
                    .key_index
                    .get(key)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                uids.into_iter()
                    .filter_map(|uid| self.get_at(uid, max_version))
                    .filter(|r| predicate.matches(&r.account))
                    .collect()
            }
            Predicate::KindEq(_) => self
                .records
                .iter()
                .filter_map(|entry| {
                    let uid = *entry.key();
                    let visible = entry.value().get_at_version(max_version)?;
                    let account = visible.value()?;
                    predicate.matches(account).then(|| VisibleRecord {
                        uid,
                        version: visible.version(),
                        account: with_uid(account, uid),
                    })
                })
                .collect(),
        };
        results.sort_by_key(|r| r.uid);
        results
    }

    /// Apply a committed batch at `commit_version` and publish it
    ///
    /// Caller must serialize writers and pass `current_version() + 1`.
    pub fn apply(&self, commit_version: u64, writes: &[(Uid, Account)], deletes: &[Uid]) {
        debug_assert_eq!(commit_version, self.current_version() + 1);

        for (uid, account) in writes {
            let record = StoredRecord::live(commit_version, with_uid(account, *uid));
            match self.records.entry(*uid) {
                Entry::Occupied(mut chain) => chain.get_mut().push(record),
                Entry::Vacant(slot) => {
                    slot.insert(VersionChain::new(record));
                }
            }
            self.key_index.entry(account.key).or_default().insert(*uid);
        }

        let mut tombstoned = Vec::new();
        for uid in deletes {
            if let Some(mut chain) = self.records.get_mut(uid) {
                let key = match chain.latest().and_then(StoredRecord::value) {
                    Some(account) => account.key,
                    None => continue,
                };
                chain.push(StoredRecord::tombstone(commit_version));
                tombstoned.push((commit_version, *uid, key));
            }
        }
        if !tombstoned.is_empty() {
            self.tombstones.lock().extend(tombstoned);
        }

        self.version.store(commit_version, Ordering::Release);

        let floor = self.gc_floor();
        for uid in writes.iter().map(|(uid, _)| uid).chain(deletes.iter()) {
            if let Some(mut chain) = self.records.get_mut(uid) {
                chain.gc(floor);
            }
        }
        self.vacuum(floor);
    }

    /// Remove every record and publish a new version
    ///
    /// Snapshots taken before the clear observe an empty store afterwards.
    /// Caller must serialize this with `apply`.
    pub fn clear(&self) -> u64 {
        self.records.clear();
        self.key_index.clear();
        self.tombstones.lock().clear();
        let version = self.current_version() + 1;
        self.version.store(version, Ordering::Release);
        tracing::debug!(target: "bank::store", version, "storage cleared");
        version
    }

    /// Take a snapshot at the current version
    pub fn snapshot(self: &Arc<Self>) -> SnapshotView {
        let mut active = self.snapshots.lock();
        let version = self.current_version();
        *active.entry(version).or_insert(0) += 1;
        drop(active);
        SnapshotView::new(Arc::clone(self), version)
    }

    pub(crate) fn release_snapshot(&self, version: u64) {
        let mut active = self.snapshots.lock();
        if let Some(count) = active.get_mut(&version) {
            *count -= 1;
            if *count == 0 {
                active.remove(&version);
            }
        }
    }

    /// Oldest version any active snapshot can still read
    pub fn gc_floor(&self) -> u64 {
        let active = self.snapshots.lock();
        active
            .keys()
            .next()
            .copied()
            .unwrap_or_else(|| self.current_version())
    }

    /// Number of snapshots currently held
    pub fn active_snapshots(&self) -> usize {
        self.snapshots.lock().values().sum()
    }

    /// Number of version chains held, tombstoned ones included
    pub fn chain_count(&self) -> usize {
        self.records.len()
    }

    /// Number of live records as of `max_version`
    pub fn live_count_at(&self, max_version: u64) -> usize {
        self.records
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .get_at_version(max_version)
                    .map_or(false, |r| !r.is_tombstone())
            })
            .count()
    }

    /// Drop chains whose newest entry is a tombstone no snapshot can see past
    fn vacuum(&self, floor: u64) {
        let mut pending = self.tombstones.lock();
        while let Some(&(version, uid, key)) = pending.front() {
            if version > floor {
                break;
            }
            pending.pop_front();
            let removed = self
                .records
                .remove_if(&uid, |_, chain| {
                    chain
                        .latest()
                        .map_or(false, |r| r.is_tombstone() && r.version() == version)
                })
                .is_some();
            if removed {
                if let Some(mut uids) = self.key_index.get_mut(&key) {
                    uids.remove(&uid);
                }
            }
        }
    }
}

impl Default for VersionedStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn with_uid(account: &Account, uid: Uid) -> Account {
    let mut account = account.clone();
    account.uid = Some(uid);
    account
}
