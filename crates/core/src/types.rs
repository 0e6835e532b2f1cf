//! Core types for the bank harness
//!
//! This module defines the foundational types:
//! - RunId: Unique identifier for a harness run
//! - Uid: Store-assigned record reference
//! - Predicate: The two query shapes the harness issues
//! - Mutation / Assigned: Write batches and the references they produce
//! - Operation / Schema: Administrative (alter) requests
//! - Credentials: Login material for ACL-enabled stores

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::account::{Account, ACCOUNT_KIND};

/// Unique identifier for a harness run
///
/// A RunId is a wrapper around a UUID v4. It tags every log line and the
/// final report so that interleaved runs against a shared store can be told
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a RunId from a string representation
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque store-assigned record reference
///
/// Rendered as `0x`-prefixed lowercase hex, both in `Display` and on the
/// wire. A zero uid is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(u64);

impl Uid {
    /// Wrap a raw reference value
    pub const fn new(raw: u64) -> Self {
        Uid(raw)
    }

    /// Raw reference value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Error returned when a uid string is malformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid uid '{0}': expected 0x-prefixed hex")]
pub struct UidParseError(pub String);

impl FromStr for Uid {
    type Err = UidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| UidParseError(s.to_string()))?;
        u64::from_str_radix(hex, 16)
            .map(Uid)
            .map_err(|_| UidParseError(s.to_string()))
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Query predicate understood by every store backend
///
/// The harness needs exactly two query shapes: a point lookup by account
/// key, and a full scan of one record kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// All records whose `key` equals the given id
    KeyEq(u64),
    /// All records whose `typ` equals the given tag
    KindEq(String),
}

impl Predicate {
    /// Full scan of account records
    pub fn accounts() -> Self {
        Predicate::KindEq(ACCOUNT_KIND.to_string())
    }

    /// Name of the schema predicate this query filters on
    pub fn field(&self) -> &'static str {
        match self {
            Predicate::KeyEq(_) => "key",
            Predicate::KindEq(_) => "typ",
        }
    }

    /// Check whether a record satisfies this predicate
    pub fn matches(&self, account: &Account) -> bool {
        match self {
            Predicate::KeyEq(key) => account.key == *key,
            Predicate::KindEq(kind) => account.typ == *kind,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::KeyEq(key) => {
                write!(f, "{{ q(func: eq(key, {})) {{ key, uid, bal, typ }}}}", key)
            }
            Predicate::KindEq(kind) => {
                write!(f, "{{ q(func: eq(typ, \"{}\")) {{ uid key bal }}}}", kind)
            }
        }
    }
}

/// A batch of writes issued inside one transaction
///
/// `set` entries with a uid update that record; entries without a uid
/// create a new record and receive an assigned reference under their
/// blank-node label. `delete` entries must carry a uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    /// Records to create or update
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set: Vec<Account>,
    /// Records to delete
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<Account>,
}

impl Mutation {
    /// Mutation that creates or updates a single record
    pub fn set(account: Account) -> Self {
        Mutation {
            set: vec![account],
            delete: Vec::new(),
        }
    }

    /// Mutation that creates or updates many records
    pub fn set_all(accounts: Vec<Account>) -> Self {
        Mutation {
            set: accounts,
            delete: Vec::new(),
        }
    }

    /// Mutation that deletes a single record
    pub fn delete(account: Account) -> Self {
        Mutation {
            set: Vec::new(),
            delete: vec![account],
        }
    }

    /// True if the mutation carries no writes
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }
}

/// References assigned by the store to records created by a mutation
///
/// Keyed by the blank-node label of the created record (see
/// [`Account::blank_label`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assigned {
    /// Label → assigned uid
    pub uids: BTreeMap<String, Uid>,
}

impl Assigned {
    /// True if the mutation created nothing
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Uid assigned to the given label, if any
    pub fn get(&self, label: &str) -> Option<Uid> {
        self.uids.get(label).copied()
    }
}

/// Scalar type of a schema predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// Integer values
    Int,
    /// String values
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => write!(f, "int"),
            ValueType::String => write!(f, "string"),
        }
    }
}

/// Schema entry for one predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateSchema {
    /// Predicate name (`key`, `bal`, `typ`)
    pub name: String,
    /// Scalar type
    pub value_type: ValueType,
    /// Whether equality lookups on this predicate are indexed
    pub index: bool,
    /// Whether the store must detect conflicts on this predicate's index
    pub upsert: bool,
}

/// Store schema: the set of predicate definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Predicate definitions
    pub predicates: Vec<PredicateSchema>,
}

impl Schema {
    /// Schema required by the bank workload
    ///
    /// `key` and `typ` are indexed and upsert-protected so that concurrent
    /// creators of the same absent account conflict instead of both
    /// committing.
    pub fn accounts() -> Self {
        Schema {
            predicates: vec![
                PredicateSchema {
                    name: "key".to_string(),
                    value_type: ValueType::Int,
                    index: true,
                    upsert: true,
                },
                PredicateSchema {
                    name: "bal".to_string(),
                    value_type: ValueType::Int,
                    index: false,
                    upsert: false,
                },
                PredicateSchema {
                    name: "typ".to_string(),
                    value_type: ValueType::String,
                    index: true,
                    upsert: true,
                },
            ],
        }
    }

    /// Look up a predicate definition by name
    pub fn predicate(&self, name: &str) -> Option<&PredicateSchema> {
        self.predicates.iter().find(|p| p.name == name)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.predicates {
            write!(f, "{}: {}", p.name, p.value_type)?;
            if p.index {
                let tokenizer = match p.value_type {
                    ValueType::Int => "int",
                    ValueType::String => "exact",
                };
                write!(f, " @index({})", tokenizer)?;
            }
            if p.upsert {
                write!(f, " @upsert")?;
            }
            writeln!(f, " .")?;
        }
        Ok(())
    }
}

/// Administrative request: drop all data and/or install a schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    /// Remove every record and the current schema
    pub drop_all: bool,
    /// Schema to install (merged by predicate name)
    pub schema: Option<Schema>,
}

impl Operation {
    /// Drop-all request
    pub fn drop_all() -> Self {
        Operation {
            drop_all: true,
            schema: None,
        }
    }

    /// Schema installation request
    pub fn schema(schema: Schema) -> Self {
        Operation {
            drop_all: false,
            schema: Some(schema),
        }
    }
}

/// Login material for privileged administrative operations
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_display_and_parse() {
        let uid = Uid::new(0x2a);
        assert_eq!(uid.to_string(), "0x2a");
        assert_eq!("0x2a".parse::<Uid>().unwrap(), uid);
    }

    #[test]
    fn test_uid_parse_rejects_missing_prefix() {
        assert!("2a".parse::<Uid>().is_err());
        assert!("0xzz".parse::<Uid>().is_err());
    }

    #[test]
    fn test_uid_serde_as_string() {
        let json = serde_json::to_string(&Uid::new(255)).unwrap();
        assert_eq!(json, "\"0xff\"");
        let back: Uid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Uid::new(255));
    }

    #[test]
    fn test_predicate_matches() {
        let account = Account::new(3, 10);
        assert!(Predicate::KeyEq(3).matches(&account));
        assert!(!Predicate::KeyEq(4).matches(&account));
        assert!(Predicate::accounts().matches(&account));
        assert!(!Predicate::KindEq("other".to_string()).matches(&account));
    }

    #[test]
    fn test_predicate_display_renders_query() {
        let q = Predicate::KeyEq(7).to_string();
        assert!(q.contains("eq(key, 7)"));
        let q = Predicate::accounts().to_string();
        assert!(q.contains("eq(typ, \"ba\")"));
    }

    #[test]
    fn test_account_schema_text() {
        let text = Schema::accounts().to_string();
        assert!(text.contains("key: int @index(int) @upsert ."));
        assert!(text.contains("bal: int ."));
        assert!(text.contains("typ: string @index(exact) @upsert ."));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::accounts();
        assert!(schema.predicate("key").unwrap().index);
        assert!(!schema.predicate("bal").unwrap().index);
        assert!(schema.predicate("missing").is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("groot", "password");
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("groot"));
        assert!(!dbg.contains("\"password\""));
    }

    #[test]
    fn test_run_id_unique() {
        assert_ne!(RunId::new(), RunId::new());
        let id = RunId::new();
        assert_eq!(RunId::from_string(&id.to_string()), Some(id));
    }
}
