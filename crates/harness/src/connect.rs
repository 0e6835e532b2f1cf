//! Store connections

use bank_core::{Connector, Credentials, Store};
use std::sync::Arc;
use tracing::info;

use crate::error::{HarnessError, HarnessResult};

/// Dial every endpoint, logging in on each when credentials are given
///
/// # Errors
///
/// A failed dial or login is a `Setup` error naming the endpoint.
pub fn connect_all(
    connector: &dyn Connector,
    endpoints: &[String],
    credentials: Option<&Credentials>,
) -> HarnessResult<Vec<Arc<dyn Store>>> {
    endpoints
        .iter()
        .map(|endpoint| {
            let store = connector
                .connect(endpoint)
                .map_err(|e| HarnessError::setup(format!("connect {}", endpoint), e))?;
            if let Some(credentials) = credentials {
                store
                    .login(credentials)
                    .map_err(|e| HarnessError::setup(format!("login {}", endpoint), e))?;
            }
            info!(target: "bank::harness", endpoint = %endpoint, "connected");
            Ok(store)
        })
        .collect()
}
