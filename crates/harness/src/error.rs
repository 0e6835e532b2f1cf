//! Harness error types
//!
//! Failures fall into three groups, and only the first is recoverable:
//!
//! | Category | Where | Outcome |
//! |----------|-------|---------|
//! | Transient conflict | commit, lookup, mutate | counted as an abort, never an error here |
//! | Structural violation | checker, account lookup | [`Violation`], stops the run |
//! | Setup / fatal store failure | connect, alter, discard, read-only check | stops the run |

use bank_core::StoreError;
use thiserror::Error;

/// Result type alias for harness operations
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// A consistency violation observed in the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// More than one record carries the same account key
    #[error("found {count} accounts for key K_{key:02}. query: {query}. response: {response}")]
    DuplicateAccount {
        /// Account key
        key: u64,
        /// Number of records returned
        count: usize,
        /// Query text that was issued
        query: String,
        /// Response as returned by the store
        response: String,
    },

    /// More materialized accounts than were ever created
    #[error("found {found} accounts, at most {max} may exist. accounts: {accounts}")]
    TooManyAccounts {
        /// Accounts read
        found: usize,
        /// Configured account count
        max: u64,
        /// Rendered account list
        accounts: String,
    },

    /// Balance was created or destroyed
    #[error("total balance {actual} != expected {expected}. accounts: {accounts}")]
    TotalMismatch {
        /// `accounts × starting balance`
        expected: u64,
        /// Sum read from the store
        actual: u64,
        /// Rendered account list
        accounts: String,
    },
}

/// Errors that stop a harness run
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Connection, login or initial bulk load failed
    #[error("setup failed at {stage}: {source}")]
    Setup {
        /// What was being done
        stage: String,
        /// Store error
        #[source]
        source: StoreError,
    },

    /// The store broke a consistency invariant
    #[error("invariant violated: {0}")]
    Violation(#[from] Violation),

    /// A store call that must not fail did
    #[error("fatal store error during {operation}: {source}")]
    Store {
        /// Operation that failed
        operation: &'static str,
        /// Store error
        #[source]
        source: StoreError,
    },

    /// Configuration could not be loaded or is invalid
    #[error("invalid configuration: {reason}")]
    Config {
        /// Why the configuration was rejected
        reason: String,
    },

    /// A worker thread panicked
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Worker index
        worker: usize,
    },
}

impl HarnessError {
    /// Create a setup error
    pub fn setup(stage: impl Into<String>, source: StoreError) -> Self {
        HarnessError::Setup {
            stage: stage.into(),
            source,
        }
    }

    /// Create a fatal store error
    pub fn store(operation: &'static str, source: StoreError) -> Self {
        HarnessError::Store { operation, source }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        HarnessError::Config {
            reason: reason.into(),
        }
    }

    /// The violation, if this error is one
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            HarnessError::Violation(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_violation_display_carries_context() {
        let v = Violation::DuplicateAccount {
            key: 3,
            count: 2,
            query: "{ q(func: eq(key, 3)) { key, uid, bal, typ }}".to_string(),
            response: r#"{"q":[]}"#.to_string(),
        };
        let msg = v.to_string();
        assert!(msg.contains("K_03"));
        assert!(msg.contains("eq(key, 3)"));
        assert!(msg.contains(r#"{"q":[]}"#));
    }

    #[test]
    fn test_total_mismatch_display() {
        let v = Violation::TotalMismatch {
            expected: 20,
            actual: 19,
            accounts: "[]".to_string(),
        };
        assert!(v.to_string().contains("19 != expected 20"));
    }

    #[test]
    fn test_violation_converts() {
        let err: HarnessError = Violation::TooManyAccounts {
            found: 3,
            max: 2,
            accounts: String::new(),
        }
        .into();
        assert!(err.violation().is_some());
        assert!(err.to_string().starts_with("invariant violated"));
    }

    #[test]
    fn test_store_error_is_source() {
        let err = HarnessError::store("discard", StoreError::internal("io"));
        assert!(err.violation().is_none());
        assert!(err.source().unwrap().to_string().contains("io"));
    }
}
