//! Error types for the store contract
//!
//! Every store backend reports failures as [`StoreError`]. The harness only
//! needs to tell one category apart from the rest: transient commit
//! conflicts, which are counted as aborts. Everything else is either a
//! setup failure or a fatal error, depending on where it happens.
//!
//! # Categories
//!
//! | Category | Variants | Description |
//! |----------|----------|-------------|
//! | Concurrency | `Conflict` | Commit lost a race; retry is expected |
//! | Transaction | `TxnFinished`, `ReadOnly` | Misuse of a transaction handle |
//! | Access | `PermissionDenied`, `Unavailable` | Connection and ACL failures |
//! | Validation | `InvalidQuery`, `InvalidMutation` | Bad request against the schema |
//! | System | `Internal` | Anything else |

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by a store backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transaction was aborted because a concurrent commit invalidated it
    #[error("transaction has been aborted, please retry: {reason}")]
    Conflict {
        /// Human-readable conflict description
        reason: String,
    },

    /// Operation on a transaction that was already committed or discarded
    #[error("transaction {txn_id} has already been committed or discarded")]
    TxnFinished {
        /// Transaction id
        txn_id: u64,
    },

    /// Mutation attempted in a read-only transaction
    #[error("mutation not allowed in read-only transaction {txn_id}")]
    ReadOnly {
        /// Transaction id
        txn_id: u64,
    },

    /// Operation requires a privileged login
    #[error("permission denied for {operation}: {reason}")]
    PermissionDenied {
        /// Operation that was refused
        operation: String,
        /// Why it was refused
        reason: String,
    },

    /// Endpoint could not be reached
    #[error("endpoint {endpoint} unavailable: {reason}")]
    Unavailable {
        /// Endpoint address
        endpoint: String,
        /// Why the connection failed
        reason: String,
    },

    /// Query is not valid against the current schema
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Why the query was rejected
        reason: String,
    },

    /// Mutation is malformed
    #[error("invalid mutation: {reason}")]
    InvalidMutation {
        /// Why the mutation was rejected
        reason: String,
    },

    /// Internal backend failure
    #[error("internal store error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl StoreError {
    /// Create a conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        StoreError::Conflict {
            reason: reason.into(),
        }
    }

    /// Create a permission error
    pub fn permission_denied(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::PermissionDenied {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable-endpoint error
    pub fn unavailable(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-query error
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        StoreError::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Create an invalid-mutation error
    pub fn invalid_mutation(reason: impl Into<String>) -> Self {
        StoreError::InvalidMutation {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::Internal {
            message: message.into(),
        }
    }

    /// True for transient commit conflicts
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
