//! Scoped transaction guard
//!
//! Every transaction the harness opens must be discarded on every exit
//! path. [`TxnScope`] owns the handle, derefs to it, and discards it either
//! explicitly through [`TxnScope::close`], where a failure is reported to
//! the caller, or on drop, where a failure can only be logged.

use bank_core::{Store, StoreResult, Transaction};
use std::ops::{Deref, DerefMut};

use crate::error::{HarnessError, HarnessResult};

/// Owns a transaction and guarantees it is discarded
pub struct TxnScope {
    txn: Box<dyn Transaction>,
    closed: bool,
}

impl TxnScope {
    /// Begin a transaction on `store`
    pub fn begin(store: &dyn Store, read_only: bool) -> StoreResult<Self> {
        Ok(TxnScope {
            txn: store.begin(read_only)?,
            closed: false,
        })
    }

    /// Discard the transaction
    ///
    /// Safe after commit. A discard failure means the store may be leaking
    /// transaction state, so it is fatal for the run.
    pub fn close(mut self) -> HarnessResult<()> {
        self.closed = true;
        self.txn
            .discard()
            .map_err(|e| HarnessError::store("discard", e))
    }
}

impl Deref for TxnScope {
    type Target = dyn Transaction;

    fn deref(&self) -> &Self::Target {
        self.txn.as_ref()
    }
}

impl DerefMut for TxnScope {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.txn.as_mut()
    }
}

impl Drop for TxnScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.txn.discard() {
            tracing::error!(
                target: "bank::harness",
                txn_id = self.txn.txn_id(),
                error = %e,
                "discarding transaction failed"
            );
        }
    }
}
