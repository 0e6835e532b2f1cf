//! Stress Tests
//!
//! Long, heavily contended runs. All marked #[ignore] for opt-in execution.
//! Run with: cargo test --test harness stress -- --ignored

use crate::common::*;
use bankstress::{Harness, HarnessConfig, MemoryCluster};
use std::sync::Arc;

#[test]
#[ignore]
fn stress_two_accounts_heavy_contention() {
    let cluster = MemoryCluster::new([ENDPOINT]);
    let config = quick_config(2, 32, "5s", ENDPOINT);
    let report = Harness::new(config, Arc::new(cluster)).run().unwrap();

    assert_eq!(report.final_total, 20);
    assert!(report.successes >= 32);
    println!("{}", report);
}

#[test]
#[ignore]
fn stress_many_accounts_many_endpoints() {
    let alpha = "a:9080,b:9080,c:9080,d:9080";
    let cluster = MemoryCluster::new(alpha.split(','));
    let config = HarnessConfig {
        check_every: 3,
        ..quick_config(50, 8, "10s", alpha)
    };
    let report = Harness::new(config, Arc::new(cluster.clone())).run().unwrap();

    assert_eq!(report.workers, 32);
    assert_eq!(report.final_total, 500);
    assert!(cluster.metrics().commit_rate() > 0.0);
    println!("{}", report);
}

#[test]
#[ignore]
fn stress_unseeded_runs_pass() {
    for _ in 0..5 {
        let cluster = MemoryCluster::new([ENDPOINT]);
        let config = HarnessConfig {
            seed: None,
            ..quick_config(3, 6, "1s", ENDPOINT)
        };
        let report = Harness::new(config, Arc::new(cluster)).run().unwrap();
        assert_eq!(report.final_total, 30);
    }
}
