//! Core types and traits for bankstress
//!
//! This crate defines the foundational types used throughout the system:
//! - Account: The record moved between workers through the store
//! - Uid / RunId: Store references and run identity
//! - Predicate / Mutation / Operation / Schema: The store request vocabulary
//! - StoreError: Error type of the store contract
//! - Traits: Store, Transaction, Connector

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod error;
pub mod traits;
pub mod types;

pub use account::{Account, ACCOUNT_KIND};
pub use error::{StoreError, StoreResult};
pub use traits::{Connector, Store, Transaction};
pub use types::{
    Assigned, Credentials, Mutation, Operation, Predicate, PredicateSchema, RunId, Schema, Uid,
    UidParseError, ValueType,
};
