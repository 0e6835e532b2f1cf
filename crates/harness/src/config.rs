//! Harness configuration
//!
//! Defaults reproduce the classic bank test: 2 accounts of 10 each, 3
//! workers per endpoint, one minute against `localhost:9080`. Values can be
//! loaded from a TOML file and then overridden field by field by the CLI.

use bank_core::Credentials;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::error::{HarnessError, HarnessResult};

/// Harness configuration
///
/// # Example
///
/// ```toml
/// users = 5
/// txns = 4
/// dur = "30s"
/// alpha = "localhost:9080,localhost:9081"
/// verbose = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of accounts
    pub users: u64,
    /// Concurrent workers per endpoint
    pub txns: usize,
    /// Run duration, Go syntax (`1m`, `30s`, `1h30m`, `500ms`)
    pub dur: String,
    /// Comma separated endpoint addresses
    pub alpha: String,
    /// Log every transfer and every total check
    pub verbose: bool,
    /// Log in before administrative operations
    pub login: bool,
    /// Initial balance of each account
    pub starting_balance: u64,
    /// Seed for the worker RNGs; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Every n-th loop iteration runs a total check instead of a transfer
    pub check_every: u64,
    /// Log a progress line every n successful transfers
    pub progress_every: u64,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            users: 2,
            txns: 3,
            dur: "1m".to_string(),
            alpha: "localhost:9080".to_string(),
            verbose: true,
            login: true,
            starting_balance: 10,
            seed: None,
            check_every: 5,
            progress_every: 100,
            user: "groot".to_string(),
            password: "password".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Returns the default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# bankstress configuration

# Number of accounts
users = 2

# Concurrent workers per endpoint
txns = 3

# How long to run the transfers ("1m", "30s", "1h30m", "500ms")
dur = "1m"

# Comma separated store endpoints
alpha = "localhost:9080"

# Log every transfer and total check
verbose = true

# Log in before dropping data and installing the schema
login = true
user = "groot"
password = "password"

# Initial balance of each account
starting_balance = 10

# Run a total check every n-th iteration, log progress every n successes
check_every = 5
progress_every = 100

# Fixed seed for reproducible picks (random when unset)
# seed = 42
"#
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text is not valid TOML for this struct.
    pub fn from_toml_str(content: &str) -> HarnessResult<Self> {
        toml::from_str(content).map_err(|e| HarnessError::config(format!("parse error: {}", e)))
    }

    /// Read and parse config from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            HarnessError::config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize this config to TOML and write it to the given path
    pub fn write_to_file(&self, path: &Path) -> HarnessResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HarnessError::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            HarnessError::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Check every field is usable
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.users < 2 {
            return Err(HarnessError::config(format!(
                "users must be at least 2, got {}",
                self.users
            )));
        }
        if self.txns == 0 {
            return Err(HarnessError::config("txns must be at least 1"));
        }
        if self.endpoints().is_empty() {
            return Err(HarnessError::config("alpha must name at least one endpoint"));
        }
        if self.duration()?.is_zero() {
            return Err(HarnessError::config("dur must be positive"));
        }
        if self.starting_balance == 0 {
            return Err(HarnessError::config("starting_balance must be positive"));
        }
        if self.expected_total().is_none() {
            return Err(HarnessError::config(
                "users × starting_balance overflows a 64-bit total",
            ));
        }
        // With 1 every iteration is a check and no worker ever transfers.
        if self.check_every < 2 {
            return Err(HarnessError::config("check_every must be at least 2"));
        }
        if self.progress_every == 0 {
            return Err(HarnessError::config("progress_every must be at least 1"));
        }
        Ok(())
    }

    /// Parsed run duration
    pub fn duration(&self) -> HarnessResult<Duration> {
        parse_duration(&self.dur).map_err(|e| HarnessError::config(e.to_string()))
    }

    /// Endpoint list, trimmed, empty entries dropped
    pub fn endpoints(&self) -> Vec<String> {
        self.alpha
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Login credentials, if login is enabled
    pub fn credentials(&self) -> Option<Credentials> {
        self.login
            .then(|| Credentials::new(self.user.clone(), self.password.clone()))
    }

    /// Conserved total balance, `None` on overflow
    pub fn expected_total(&self) -> Option<u64> {
        self.users.checked_mul(self.starting_balance)
    }
}

/// Error returned for a malformed duration string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationParseError {
    /// The rejected text
    pub input: String,
    /// What was wrong with it
    pub reason: &'static str,
}

/// Parse a Go-style duration: a sequence of decimal numbers, each with a
/// unit suffix (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`), e.g. `1h30m` or `1.5s`
///
/// A bare `0` is accepted. Negative durations are not.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let err = |reason| DurationParseError {
        input: input.to_string(),
        reason,
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(err("empty"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(err("expected a number"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| err("malformed number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(err("missing unit")),
            _ => return Err(err("unknown unit")),
        };
        rest = &rest[unit_len..];
        nanos += value * scale;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(err("out of range"));
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
