//! Invariant checker
//!
//! Reads every account in one read-only transaction, so the whole check
//! sees a single snapshot, and asserts that balance is conserved and no
//! more accounts exist than were created.

use bank_core::{Account, Predicate, Store};
use serde::Serialize;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult, Violation};
use crate::scope::TxnScope;

/// Snapshot totals from a passing check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalReport {
    /// Accounts read, sorted by key
    pub accounts: Vec<Account>,
    /// Sum of balances
    pub total: u64,
    /// Number of records read
    pub materialized: usize,
}

/// Check conservation of the total balance
///
/// # Errors
///
/// - `Violation` if there are more than `users` accounts or the sum is not
///   `users × starting_balance`
/// - `Store` if the read-only snapshot cannot be read
pub fn check_total(
    store: &dyn Store,
    users: u64,
    starting_balance: u64,
) -> HarnessResult<TotalReport> {
    let mut scope =
        TxnScope::begin(store, true).map_err(|e| HarnessError::store("begin total check", e))?;
    let result = scope.query(&Predicate::accounts());
    scope.close()?;
    let mut accounts = result.map_err(|e| HarnessError::store("total check query", e))?;

    accounts.sort_by_key(|a| a.key);
    let total: u64 = accounts.iter().map(|a| a.bal).sum();
    debug!(
        target: "bank::harness",
        accounts = %render_accounts(&accounts),
        total,
        "read totals"
    );

    if accounts.len() as u64 > users {
        return Err(Violation::TooManyAccounts {
            found: accounts.len(),
            max: users,
            accounts: render_accounts(&accounts),
        }
        .into());
    }
    let expected = users.saturating_mul(starting_balance);
    if total != expected {
        return Err(Violation::TotalMismatch {
            expected,
            actual: total,
            accounts: render_accounts(&accounts),
        }
        .into());
    }

    let materialized = accounts.len();
    Ok(TotalReport {
        accounts,
        total,
        materialized,
    })
}

/// `[K_01[0x1] bal=10, K_02[0x2] bal=10]`
pub fn render_accounts(accounts: &[Account]) -> String {
    let items: Vec<String> = accounts.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stored, ScriptedStore};
    use bank_core::StoreError;

    #[test]
    fn test_passing_check_sorts_by_key() {
        let store = ScriptedStore::new(vec![stored(9, 2, 12), stored(4, 1, 8)]);
        let report = check_total(&store, 2, 10).unwrap();
        assert_eq!(report.total, 20);
        assert_eq!(report.materialized, 2);
        assert_eq!(report.accounts[0].key, 1);
        assert_eq!(store.discards(), 1);
    }

    #[test]
    fn test_absent_accounts_count_as_zero() {
        let store = ScriptedStore::new(vec![stored(1, 2, 20)]);
        let report = check_total(&store, 2, 10).unwrap();
        assert_eq!(report.materialized, 1);
    }

    #[test]
    fn test_sum_mismatch() {
        let store = ScriptedStore::new(vec![stored(1, 1, 10), stored(2, 2, 9)]);
        let err = check_total(&store, 2, 10).unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(Violation::TotalMismatch {
                expected: 20,
                actual: 19,
                ..
            })
        ));
    }

    #[test]
    fn test_too_many_accounts() {
        let store = ScriptedStore::new(vec![
            stored(1, 1, 10),
            stored(2, 2, 5),
            stored(3, 2, 5),
        ]);
        let err = check_total(&store, 2, 10).unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(Violation::TooManyAccounts { found: 3, max: 2, .. })
        ));
    }

    #[test]
    fn test_query_failure_is_fatal_store_error() {
        let store = ScriptedStore::new(vec![]).fail_query(StoreError::internal("boom"));
        let err = check_total(&store, 2, 10).unwrap_err();
        assert!(matches!(err, HarnessError::Store { .. }));
        assert_eq!(store.discards(), 1);
    }

    #[test]
    fn test_render_accounts() {
        let text = render_accounts(&[stored(1, 1, 10), stored(2, 2, 0)]);
        assert_eq!(text, "[K_01[0x1] bal=10, K_02[0x2] bal=0]");
    }
}
