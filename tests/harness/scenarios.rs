//! Scenario Tests
//!
//! Full runs and the store behaviours the harness depends on.

use crate::common::*;
use bankstress::{
    check_total, create_accounts, execute_transfer, Account, Connector, Credentials, Harness,
    HarnessConfig, HarnessError, MemoryCluster, Mutation, Operation, Predicate, StoreError,
    TransferOutcome, Violation,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

// ============================================================================
// Full runs
// ============================================================================

#[test]
fn single_worker_two_accounts_conserves_total() {
    let cluster = MemoryCluster::new([ENDPOINT]);
    let config = quick_config(2, 1, "200ms", ENDPOINT);
    let report = Harness::new(config, Arc::new(cluster.clone())).run().unwrap();

    assert_eq!(report.workers, 1);
    assert_eq!(report.final_total, 20);
    assert!(report.materialized <= 2);
    // A lone worker never conflicts.
    assert_eq!(report.aborts, 0);

    let store = cluster.connect(ENDPOINT).unwrap();
    let (count, total) = totals(store.as_ref());
    assert!(count <= 2);
    assert_eq!(total, 20);
}

#[test]
fn five_accounts_four_workers() {
    let cluster = MemoryCluster::new([ENDPOINT]);
    let config = quick_config(5, 4, "300ms", ENDPOINT);
    let report = Harness::new(config, Arc::new(cluster)).run().unwrap();

    assert_eq!(report.workers, 4);
    assert_eq!(report.final_total, 50);
    assert!(report.materialized <= 5);
    assert!(report.successes >= 4);
}

#[test]
fn workers_spread_over_endpoints() {
    let alpha = "a:9080,b:9080,c:9080";
    let cluster = MemoryCluster::new(alpha.split(','));
    let config = quick_config(4, 2, "200ms", alpha);
    let report = Harness::new(config, Arc::new(cluster.clone())).run().unwrap();

    assert_eq!(report.endpoints, 3);
    assert_eq!(report.workers, 6);
    assert_eq!(report.final_total, 40);
    // All endpoints share one dataset.
    let store = cluster.connect("c:9080").unwrap();
    assert_eq!(totals(store.as_ref()).1, 40);
}

#[test]
fn two_accounts_eight_workers_make_progress() {
    let cluster = MemoryCluster::new([ENDPOINT]);
    let config = quick_config(2, 8, "300ms", ENDPOINT);
    let report = Harness::new(config, Arc::new(cluster)).run().unwrap();

    // Every worker exits only after a success, so each contributes one.
    assert!(report.successes >= 8);
    assert_eq!(report.final_total, 20);
    // Eight writers on two records must collide.
    assert!(report.aborts > 0);
    // Workers stop at their first success past the deadline, so the run
    // overshoots 300ms only by a bounded amount.
    assert!(report.elapsed_secs >= 0.3);
    assert!(report.elapsed_secs < 2.3, "overshot: {}s", report.elapsed_secs);
}

#[test]
fn login_run_against_acl_cluster() {
    let config = HarnessConfig {
        login: true,
        ..quick_config(3, 2, "100ms", ENDPOINT)
    };
    let cluster = MemoryCluster::with_acl([ENDPOINT], config.credentials().unwrap());
    let report = Harness::new(config, Arc::new(cluster)).run().unwrap();
    assert_eq!(report.final_total, 30);
}

#[test]
fn run_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bank.toml");
    quick_config(3, 2, "100ms", ENDPOINT)
        .write_to_file(&path)
        .unwrap();

    let config = HarnessConfig::from_file(&path).unwrap();
    assert_eq!(config.seed, Some(42));
    let cluster = MemoryCluster::new(config.endpoints());
    let report = Harness::new(config, Arc::new(cluster)).run().unwrap();
    assert_eq!(report.final_total, 30);
}

#[test]
fn report_serializes_to_json() {
    let cluster = MemoryCluster::new([ENDPOINT]);
    let config = quick_config(2, 1, "50ms", ENDPOINT);
    let report = Harness::new(config, Arc::new(cluster)).run().unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["final_total"], 20);
    assert_eq!(value["seed"], 42);
    assert_eq!(value["run_id"], report.run_id.to_string());
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn setup_is_idempotent() {
    let (_cluster, store) = bank(4, 10);
    write(store.as_ref(), |txn| {
        txn.mutate(&Mutation::set(Account::new(9, 100))).unwrap();
    });
    assert_eq!(totals(store.as_ref()), (5, 140));

    create_accounts(store.as_ref(), 4, 10, false).unwrap();
    assert_eq!(totals(store.as_ref()), (4, 40));
}

#[test]
fn drop_all_requires_login_on_acl_cluster() {
    let creds = Credentials::new("groot", "password");
    let cluster = MemoryCluster::with_acl([ENDPOINT], creds.clone());
    let store = cluster.connect(ENDPOINT).unwrap();

    let err = store.alter(&Operation::drop_all()).unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied { .. }));

    assert!(store.login(&Credentials::new("groot", "wrong")).is_err());
    store.login(&creds).unwrap();
    store.alter(&Operation::drop_all()).unwrap();
}

// ============================================================================
// Transfers
// ============================================================================

/// Outcomes of `n` sequential transfers on a fresh bank.
fn transfer_sequence(seed: u64, n: usize) -> Vec<TransferOutcome> {
    let (_cluster, store) = bank(4, 10);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| execute_transfer(store.as_ref(), &mut rng, 4).unwrap())
        .collect()
}

#[test]
fn same_seed_same_transfers() {
    let a = transfer_sequence(99, 40);
    let b = transfer_sequence(99, 40);
    assert_eq!(a, b);
    assert!(a.iter().all(TransferOutcome::is_success));
}

#[test]
fn sequential_transfers_conserve_total() {
    let (_cluster, store) = bank(3, 10);
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..200 {
        let outcome = execute_transfer(store.as_ref(), &mut rng, 3).unwrap();
        assert!(outcome.is_success());
    }
    let report = check_total(store.as_ref(), 3, 10).unwrap();
    assert_eq!(report.total, 30);
    assert!(report.materialized <= 3);
}

#[test]
fn concurrent_writers_on_same_accounts_conflict() {
    let (_cluster, store) = bank(2, 10);

    let mut t1 = store.begin(false).unwrap();
    let mut t2 = store.begin(false).unwrap();
    let mut a1 = t1.query(&Predicate::KeyEq(1)).unwrap().remove(0);
    let mut a2 = t2.query(&Predicate::KeyEq(1)).unwrap().remove(0);

    a1.bal -= 1;
    a2.bal += 1;
    t1.mutate(&Mutation::set(a1)).unwrap();
    t2.mutate(&Mutation::set(a2)).unwrap();

    t1.commit().unwrap();
    let err = t2.commit().unwrap_err();
    assert!(store.is_conflict(&err));
    assert_eq!(totals(store.as_ref()), (2, 19));
}

#[test]
fn concurrent_creates_of_same_key_conflict() {
    let (_cluster, store) = bank(2, 10);
    write(store.as_ref(), |txn| {
        let acct = txn.query(&Predicate::KeyEq(2)).unwrap().remove(0);
        txn.mutate(&Mutation::delete(acct)).unwrap();
    });

    let mut t1 = store.begin(false).unwrap();
    let mut t2 = store.begin(false).unwrap();
    assert!(t1.query(&Predicate::KeyEq(2)).unwrap().is_empty());
    assert!(t2.query(&Predicate::KeyEq(2)).unwrap().is_empty());
    t1.mutate(&Mutation::set(Account::new(2, 3))).unwrap();
    t2.mutate(&Mutation::set(Account::new(2, 4))).unwrap();

    t1.commit().unwrap();
    assert!(t2.commit().unwrap_err().is_conflict());
    assert_eq!(totals(store.as_ref()).0, 2);
}

// ============================================================================
// Checker
// ============================================================================

#[test]
fn checker_detects_minted_money() {
    let (_cluster, store) = bank(2, 10);
    write(store.as_ref(), |txn| {
        let mut acct = txn.query(&Predicate::KeyEq(1)).unwrap().remove(0);
        acct.bal += 1;
        txn.mutate(&Mutation::set(acct)).unwrap();
    });

    match check_total(store.as_ref(), 2, 10).unwrap_err() {
        HarnessError::Violation(Violation::TotalMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 20);
            assert_eq!(actual, 21);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn checker_detects_duplicate_account() {
    let (_cluster, store) = bank(2, 10);
    write(store.as_ref(), |txn| {
        let mut acct = txn.query(&Predicate::KeyEq(1)).unwrap().remove(0);
        acct.bal = 4;
        txn.mutate(&Mutation::set(acct)).unwrap();
        txn.mutate(&Mutation::set(Account::new(1, 6))).unwrap();
    });

    let err = check_total(store.as_ref(), 2, 10).unwrap_err();
    assert!(matches!(
        err.violation(),
        Some(Violation::TooManyAccounts { found: 3, .. })
    ));

    // Transfers see the duplicate as a fatal violation, not an abort.
    let mut rng = StdRng::seed_from_u64(0);
    let mut saw_duplicate = false;
    for _ in 0..50 {
        match execute_transfer(store.as_ref(), &mut rng, 2) {
            Err(e) => {
                assert!(matches!(
                    e.violation(),
                    Some(Violation::DuplicateAccount { key: 1, count: 2, .. })
                ));
                saw_duplicate = true;
                break;
            }
            Ok(outcome) => assert!(outcome.is_success()),
        }
    }
    assert!(saw_duplicate);
}
