//! One-time bank initialization
//!
//! Wipes the store, installs the account schema and bulk-creates every
//! account with the starting balance in a single transaction. Running it
//! twice leaves the same state as running it once.

use bank_core::{Account, Mutation, Operation, Schema, Store};
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};
use crate::scope::TxnScope;

/// Drop all data, install the schema and create accounts `1..=users`
///
/// # Errors
///
/// Any store failure is a `Setup` error naming the failed stage.
pub fn create_accounts(
    store: &dyn Store,
    users: u64,
    starting_balance: u64,
    verbose: bool,
) -> HarnessResult<()> {
    store
        .alter(&Operation::drop_all())
        .map_err(|e| HarnessError::setup("drop all", e))?;

    let schema = Schema::accounts();
    store
        .alter(&Operation::schema(schema.clone()))
        .map_err(|e| HarnessError::setup("install schema", e))?;
    debug!(target: "bank::harness", schema = %schema, "schema installed");

    let accounts: Vec<Account> = (1..=users)
        .map(|key| Account::new(key, starting_balance))
        .collect();
    let mutation = Mutation::set_all(accounts);
    if verbose {
        debug!(
            target: "bank::harness",
            mutation = %serde_json::to_string(&mutation.set).unwrap_or_default(),
            "creating accounts"
        );
    }

    let mut scope = TxnScope::begin(store, false)
        .map_err(|e| HarnessError::setup("begin account creation", e))?;
    let result = scope
        .mutate(&mutation)
        .map_err(|e| HarnessError::setup("create accounts", e))
        .and_then(|_| {
            scope
                .commit()
                .map_err(|e| HarnessError::setup("commit accounts", e))
        });
    scope.close()?;
    result?;

    info!(
        target: "bank::harness",
        endpoint = store.endpoint(),
        users,
        starting_balance,
        "accounts created"
    );
    Ok(())
}
