//! Store abstraction
//!
//! These traits are the whole surface the harness sees of a transactional
//! store. A backend implements [`Store`] for one connection to one endpoint
//! and [`Transaction`] for the handles it hands out. [`Connector`] dials
//! endpoints.
//!
//! Thread safety: a `Store` is shared by every worker bound to its
//! connection, so it must be `Send + Sync`. A `Transaction` is owned by one
//! worker at a time.

use std::sync::Arc;

use crate::account::Account;
use crate::error::{StoreError, StoreResult};
use crate::types::{Assigned, Credentials, Mutation, Operation, Predicate};

/// One transaction against the store
///
/// # Lifecycle
///
/// 1. **BEGIN**: obtained from [`Store::begin`]
/// 2. **READ/WRITE**: `query()`, `mutate()`
/// 3. **END**: `commit()` or `discard()`
///
/// `discard()` must be safe to call after `commit()` and must be called on
/// every exit path so the backend can release the transaction's resources.
pub trait Transaction: Send {
    /// Backend-assigned transaction id
    fn txn_id(&self) -> u64;

    /// True if the transaction was opened read-only
    fn is_read_only(&self) -> bool;

    /// Return every record matching the predicate, as seen by this transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid or the transaction is finished.
    fn query(&mut self, predicate: &Predicate) -> StoreResult<Vec<Account>>;

    /// Buffer a batch of writes
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is read-only or finished, or the
    /// mutation is malformed.
    fn mutate(&mut self, mutation: &Mutation) -> StoreResult<Assigned>;

    /// Validate and commit buffered writes
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a concurrent commit invalidated
    /// this transaction.
    fn commit(&mut self) -> StoreResult<()>;

    /// Release the transaction, dropping any uncommitted writes
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend fails to release resources.
    fn discard(&mut self) -> StoreResult<()>;
}

/// One connection to a transactional store
pub trait Store: Send + Sync {
    /// Address of the endpoint this connection is bound to
    fn endpoint(&self) -> &str;

    /// Authenticate this connection for privileged operations
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PermissionDenied`] on bad credentials.
    fn login(&self, credentials: &Credentials) -> StoreResult<()>;

    /// Administrative schema operation (drop-all, schema install)
    ///
    /// # Errors
    ///
    /// Returns an error if the operation is refused or malformed.
    fn alter(&self, operation: &Operation) -> StoreResult<()>;

    /// Begin a transaction
    ///
    /// Read-only transactions observe a consistent snapshot and never
    /// conflict.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start a transaction.
    fn begin(&self, read_only: bool) -> StoreResult<Box<dyn Transaction>>;

    /// Classify an error as a transient commit conflict
    ///
    /// Backends whose conflict signal is not [`StoreError::Conflict`] override
    /// this so the transfer logic stays backend-agnostic.
    fn is_conflict(&self, err: &StoreError) -> bool {
        err.is_conflict()
    }
}

/// Dials store endpoints
pub trait Connector: Send + Sync {
    /// Open a connection to the given endpoint
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the endpoint cannot be reached.
    fn connect(&self, endpoint: &str) -> StoreResult<Arc<dyn Store>>;
}
