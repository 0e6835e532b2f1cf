//! Harness Integration Tests
//!
//! End-to-end runs of the bank workload against the in-process cluster.

#[path = "../common/mod.rs"]
mod common;

mod properties;
mod scenarios;
mod stress;
