//! Transfer engine
//!
//! One transfer is one optimistic transaction: look up two distinct
//! accounts, move a bounded random amount from one to the other, commit.
//! A lost race is an abort, reported as an outcome and never retried here;
//! the worker loop retries by trying a fresh transfer.

use bank_core::{Account, Mutation, Predicate, Store, StoreError, Transaction, Uid};
use rand::Rng;
use std::fmt;
use tracing::trace;

use crate::error::{HarnessError, HarnessResult, Violation};
use crate::scope::TxnScope;

/// Upper bound (exclusive) of a transfer amount draw
pub const MAX_AMOUNT: u64 = 10;

/// What a committed transfer did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Amount moved
    pub amount: u64,
    /// Source as read
    pub src: Account,
    /// Destination as read
    pub dst: Account,
    /// Source as written; `None` if deleted or never materialized
    pub src_after: Option<Account>,
    /// Destination as written, with its assigned uid if it was created
    pub dst_after: Account,
    /// Uid assigned to a destination created by this transfer
    pub created: Option<Uid>,
}

impl TransferRecord {
    /// True if the source record was deleted
    pub fn src_deleted(&self) -> bool {
        self.src.is_materialized() && self.src_after.is_none()
    }
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MOVED [${}, K_{:02} -> K_{:02}]. Src: {}. Dst: {}",
            self.amount, self.src.key, self.dst.key, self.src, self.dst
        )?;
        if self.src_deleted() {
            write!(f, ". Deleted K_{:02}", self.src.key)?;
        }
        if let Some(uid) = self.created {
            write!(f, ". Created K_{:02} as {}", self.dst.key, uid)?;
        }
        Ok(())
    }
}

/// Result of one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Balances moved and the transaction committed
    Committed(TransferRecord),
    /// Both picks resolved to the same account; nothing was written
    NoOp,
    /// The transaction did not commit
    Aborted {
        /// Store error text
        reason: String,
        /// The store classified the error as a transaction conflict
        conflict: bool,
    },
}

impl TransferOutcome {
    /// Committed and no-op transfers both count as successful runs
    pub fn is_success(&self) -> bool {
        !matches!(self, TransferOutcome::Aborted { .. })
    }
}

/// Why a transfer stopped early
pub(crate) enum TransferFailure {
    /// Store rejected an operation; the transfer is an abort
    Abort(StoreError),
    /// Structural violation; the run must stop
    Fatal(HarnessError),
}

impl From<StoreError> for TransferFailure {
    fn from(e: StoreError) -> Self {
        TransferFailure::Abort(e)
    }
}

impl From<Violation> for TransferFailure {
    fn from(v: Violation) -> Self {
        TransferFailure::Fatal(v.into())
    }
}

/// Pick two distinct account keys in `1..=accounts`
///
/// Draws each key from `0..=accounts` and rejects zero, retrying until the
/// two differ. Needs `accounts >= 2`.
pub fn pick_pair<R: Rng + ?Sized>(rng: &mut R, accounts: u64) -> (u64, u64) {
    debug_assert!(accounts >= 2, "need two accounts to pick a pair");
    loop {
        let src = rng.gen_range(0..=accounts);
        let dst = rng.gen_range(0..=accounts);
        if src == 0 || dst == 0 {
            continue;
        }
        if src != dst {
            return (src, dst);
        }
    }
}

/// Clamp a drawn amount to what the source holds
///
/// A draw that would leave the source at or below zero moves the whole
/// balance instead.
pub fn clamp_amount(balance: u64, draw: u64) -> u64 {
    if draw >= balance {
        balance
    } else {
        draw
    }
}

/// Look up one account by key inside `txn`
///
/// No record yields an absent account with balance 0. More than one
/// record is a duplicate-identity violation.
pub(crate) fn find_account(
    txn: &mut dyn Transaction,
    key: u64,
) -> Result<Account, TransferFailure> {
    let predicate = Predicate::KeyEq(key);
    let mut found = txn.query(&predicate)?;
    match found.len() {
        0 => {
            trace!(target: "bank::harness", key, "account not materialized");
            Ok(Account::absent(key))
        }
        1 => Ok(found.remove(0)),
        count => Err(Violation::DuplicateAccount {
            key,
            count,
            query: predicate.to_string(),
            response: serde_json::json!({ "q": found }).to_string(),
        }
        .into()),
    }
}

/// Run one transfer between two random accounts
///
/// Store errors during lookup, mutate or commit are aborts. A duplicate
/// account, or a transaction that cannot be begun or discarded, is fatal.
pub fn execute_transfer<R: Rng + ?Sized>(
    store: &dyn Store,
    rng: &mut R,
    accounts: u64,
) -> HarnessResult<TransferOutcome> {
    let (src_key, dst_key) = pick_pair(rng, accounts);
    let draw = rng.gen_range(0..MAX_AMOUNT);

    let mut scope =
        TxnScope::begin(store, false).map_err(|e| HarnessError::store("begin transfer", e))?;
    let result = transfer_in(&mut *scope, src_key, dst_key, draw);
    scope.close()?;

    match result {
        Ok(outcome) => Ok(outcome),
        Err(TransferFailure::Abort(e)) => Ok(TransferOutcome::Aborted {
            conflict: store.is_conflict(&e),
            reason: e.to_string(),
        }),
        Err(TransferFailure::Fatal(e)) => Err(e),
    }
}

fn transfer_in(
    txn: &mut dyn Transaction,
    src_key: u64,
    dst_key: u64,
    draw: u64,
) -> Result<TransferOutcome, TransferFailure> {
    let src = find_account(txn, src_key)?;
    let dst = find_account(txn, dst_key)?;
    if src.key == dst.key {
        return Ok(TransferOutcome::NoOp);
    }

    let amount = clamp_amount(src.bal, draw);
    trace!(
        target: "bank::harness",
        amount,
        src = %src,
        dst = %dst,
        "moving"
    );

    let mut src_after = src.clone();
    src_after.bal -= amount;
    let mut dst_after = dst.clone();
    dst_after.bal += amount;

    // An absent source has nothing to write back.
    let src_after = if src.is_materialized() {
        if src_after.bal == 0 {
            txn.mutate(&Mutation::delete(src_after))?;
            None
        } else {
            txn.mutate(&Mutation::set(src_after.clone()))?;
            Some(src_after)
        }
    } else {
        None
    };

    let assigned = txn.mutate(&Mutation::set(dst_after.clone()))?;
    txn.commit()?;

    let created = assigned
        .get(&dst_after.blank_label())
        .or_else(|| assigned.uids.values().next().copied());
    if let Some(uid) = created {
        dst_after.uid = Some(uid);
    }

    Ok(TransferOutcome::Committed(TransferRecord {
        amount,
        src,
        dst,
        src_after,
        dst_after,
        created,
    }))
}
