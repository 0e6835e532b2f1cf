//! SnapshotView: lazy version-bounded view of storage
//!
//! Reads go straight to live storage and filter by the snapshot version,
//! so taking a snapshot costs one registry update instead of a copy.
//!
//! # Design Notes
//!
//! - **Registered**: the view's version is recorded in the storage's
//!   snapshot registry while it lives, which holds back version GC
//! - **Immutable**: commits after creation are never visible
//! - **Released on Drop**: the registry entry is removed when the view goes

use std::fmt;
use std::sync::Arc;

use bank_core::{Predicate, Uid};

use crate::store::{VersionedStorage, VisibleRecord};

/// A point-in-time view of [`VersionedStorage`]
///
/// # Example
///
/// ```ignore
/// let storage = Arc::new(VersionedStorage::new());
/// let snapshot = storage.snapshot();
///
/// // Commits after snapshot creation are not visible
/// storage.apply(1, &[(uid, account)], &[]);
/// assert!(snapshot.get(uid).is_none());
/// ```
pub struct SnapshotView {
    storage: Arc<VersionedStorage>,
    version: u64,
}

impl SnapshotView {
    pub(crate) fn new(storage: Arc<VersionedStorage>, version: u64) -> Self {
        Self { storage, version }
    }

    /// Version this snapshot reads at
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Live value of `uid` at the snapshot version
    pub fn get(&self, uid: Uid) -> Option<VisibleRecord> {
        self.storage.get_at(uid, self.version)
    }

    /// Version of the entry for `uid` visible at the snapshot (0 if none)
    pub fn visible_version(&self, uid: Uid) -> u64 {
        self.storage.visible_version(uid, self.version)
    }

    /// Every live record matching `predicate` at the snapshot version
    pub fn scan(&self, predicate: &Predicate) -> Vec<VisibleRecord> {
        self.storage.scan_at(predicate, self.version)
    }
}

impl Drop for SnapshotView {
    fn drop(&mut self) {
        self.storage.release_snapshot(self.version);
    }
}

impl fmt::Debug for SnapshotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotView")
            .field("version", &self.version)
            .finish()
    }
}
