//! Shared helpers for the integration suites.

#![allow(dead_code)]

use bankstress::{
    create_accounts, Connector, HarnessConfig, MemoryCluster, Predicate, Store, Transaction,
};
use std::sync::Arc;

pub const ENDPOINT: &str = "localhost:9080";

/// Short, quiet, seeded config against `alpha` without login.
pub fn quick_config(users: u64, txns: usize, dur: &str, alpha: &str) -> HarnessConfig {
    HarnessConfig {
        users,
        txns,
        dur: dur.to_string(),
        alpha: alpha.to_string(),
        verbose: false,
        login: false,
        seed: Some(42),
        ..HarnessConfig::default()
    }
}

/// Fresh single-endpoint cluster with `users` accounts of `balance` each.
pub fn bank(users: u64, balance: u64) -> (MemoryCluster, Arc<dyn Store>) {
    let cluster = MemoryCluster::new([ENDPOINT]);
    let store = cluster.connect(ENDPOINT).unwrap();
    create_accounts(store.as_ref(), users, balance, false).unwrap();
    (cluster, store)
}

/// (materialized accounts, total balance) from one read-only snapshot.
pub fn totals(store: &dyn Store) -> (usize, u64) {
    let mut txn = store.begin(true).unwrap();
    let accounts = txn.query(&Predicate::accounts()).unwrap();
    txn.discard().unwrap();
    (accounts.len(), accounts.iter().map(|a| a.bal).sum())
}

/// Run `f` inside a read-write transaction and commit it.
pub fn write<F>(store: &dyn Store, f: F)
where
    F: FnOnce(&mut dyn Transaction),
{
    let mut txn = store.begin(false).unwrap();
    f(txn.as_mut());
    txn.commit().unwrap();
}
