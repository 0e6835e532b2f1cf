//! Account record
//!
//! Fixed-shape record moved through the store. Field names match the wire
//! names used in mutations and query responses (`uid`, `key`, `bal`, `typ`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Uid;

/// Kind tag carried by every account record
pub const ACCOUNT_KIND: &str = "ba";

/// A bank account
///
/// `uid` is empty until the store materializes the record. An account that
/// is absent from the store has a logical balance of zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned reference; `None` until materialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    /// Stable account id (1..=N)
    pub key: u64,
    /// Balance
    #[serde(default)]
    pub bal: u64,
    /// Kind tag
    pub typ: String,
}

impl Account {
    /// New, not yet materialized account
    pub fn new(key: u64, bal: u64) -> Self {
        Account {
            uid: None,
            key,
            bal,
            typ: ACCOUNT_KIND.to_string(),
        }
    }

    /// Stand-in for an account the store has no record of
    pub fn absent(key: u64) -> Self {
        Account::new(key, 0)
    }

    /// True if the store holds a record for this account
    pub fn is_materialized(&self) -> bool {
        self.uid.is_some()
    }

    /// Blank-node label under which a created record's uid is assigned
    pub fn blank_label(&self) -> String {
        format!("K_{:02}", self.key)
    }

    /// Render as the JSON object sent to the store
    pub fn to_json(&self) -> String {
        // Serializing a plain struct of scalars cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.uid {
            Some(uid) => write!(f, "K_{:02}[{}] bal={}", self.key, uid, self.bal),
            None => write!(f, "K_{:02}[-] bal={}", self.key, self.bal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_not_materialized() {
        let a = Account::new(1, 10);
        assert!(!a.is_materialized());
        assert_eq!(a.typ, ACCOUNT_KIND);
        assert_eq!(a.bal, 10);
    }

    #[test]
    fn test_absent_account_has_zero_balance() {
        let a = Account::absent(4);
        assert_eq!(a.key, 4);
        assert_eq!(a.bal, 0);
        assert!(a.uid.is_none());
    }

    #[test]
    fn test_json_omits_empty_uid() {
        let a = Account::new(2, 10);
        assert_eq!(a.to_json(), r#"{"key":2,"bal":10,"typ":"ba"}"#);
    }

    #[test]
    fn test_json_includes_uid() {
        let mut a = Account::new(2, 10);
        a.uid = Some(Uid::new(0x1f));
        assert_eq!(a.to_json(), r#"{"uid":"0x1f","key":2,"bal":10,"typ":"ba"}"#);
    }

    #[test]
    fn test_parse_response_without_balance() {
        let a: Account = serde_json::from_str(r#"{"uid":"0x3","key":5,"typ":"ba"}"#).unwrap();
        assert_eq!(a.bal, 0);
        assert_eq!(a.uid, Some(Uid::new(3)));
    }

    #[test]
    fn test_blank_label() {
        assert_eq!(Account::new(3, 0).blank_label(), "K_03");
        assert_eq!(Account::new(120, 0).blank_label(), "K_120");
    }
}
