//! In-process store cluster
//!
//! `MemoryCluster` models a set of named endpoints that all serve one
//! dataset, the way the nodes of a replicated store do. Each connection
//! dialled through it implements the [`Store`] contract on top of the
//! shared [`TransactionManager`].
//!
//! Administrative operations follow an ACL model: when the cluster is built
//! with credentials, `alter` is refused until the connection has logged in.

use bank_core::{
    Account, Assigned, Connector, Credentials, Mutation, Operation, Predicate, Schema, Store,
    StoreError, StoreResult, Transaction,
};
use bank_storage::VersionedStorage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::manager::{TransactionManager, TransactionMetrics};
use crate::transaction::TransactionContext;

struct ClusterState {
    endpoints: Vec<String>,
    acl: Option<Credentials>,
    manager: TransactionManager,
    schema: RwLock<Schema>,
}

/// A cluster of endpoints sharing one in-memory dataset
#[derive(Clone)]
pub struct MemoryCluster {
    state: Arc<ClusterState>,
}

impl MemoryCluster {
    /// Cluster serving the given endpoints, without ACL
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(endpoints.into_iter().map(Into::into).collect(), None)
    }

    /// Cluster whose administrative operations require `credentials`
    pub fn with_acl<I, S>(endpoints: I, credentials: Credentials) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(endpoints.into_iter().map(Into::into).collect(), Some(credentials))
    }

    fn build(endpoints: Vec<String>, acl: Option<Credentials>) -> Self {
        MemoryCluster {
            state: Arc::new(ClusterState {
                endpoints,
                acl,
                manager: TransactionManager::new(Arc::new(VersionedStorage::new())),
                schema: RwLock::new(Schema::default()),
            }),
        }
    }

    /// Endpoints this cluster answers on
    pub fn endpoints(&self) -> &[String] {
        &self.state.endpoints
    }

    /// Transaction counters across every connection
    pub fn metrics(&self) -> TransactionMetrics {
        self.state.manager.metrics()
    }

    /// Shared storage, for inspection
    pub fn storage(&self) -> &Arc<VersionedStorage> {
        self.state.manager.storage()
    }

    /// Currently installed schema
    pub fn schema(&self) -> Schema {
        self.state.schema.read().clone()
    }
}

impl Connector for MemoryCluster {
    fn connect(&self, endpoint: &str) -> StoreResult<Arc<dyn Store>> {
        if !self.state.endpoints.iter().any(|e| e == endpoint) {
            return Err(StoreError::unavailable(endpoint, "no such endpoint in cluster"));
        }
        debug!(target: "bank::store", endpoint, "connection opened");
        Ok(Arc::new(MemoryConnection {
            endpoint: endpoint.to_string(),
            state: Arc::clone(&self.state),
            logged_in: AtomicBool::new(false),
        }))
    }
}

/// One connection to a [`MemoryCluster`] endpoint
pub struct MemoryConnection {
    endpoint: String,
    state: Arc<ClusterState>,
    logged_in: AtomicBool,
}

impl MemoryConnection {
    fn ensure_privileged(&self, operation: &str) -> StoreResult<()> {
        if self.state.acl.is_some() && !self.logged_in.load(Ordering::Acquire) {
            return Err(StoreError::permission_denied(operation, "login required"));
        }
        Ok(())
    }
}

impl Store for MemoryConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn login(&self, credentials: &Credentials) -> StoreResult<()> {
        if let Some(expected) = &self.state.acl {
            if expected != credentials {
                return Err(StoreError::permission_denied(
                    "login",
                    format!("invalid credentials for user {}", credentials.user),
                ));
            }
        }
        self.logged_in.store(true, Ordering::Release);
        info!(target: "bank::store", endpoint = %self.endpoint, user = %credentials.user, "logged in");
        Ok(())
    }

    fn alter(&self, operation: &Operation) -> StoreResult<()> {
        if operation.drop_all {
            self.ensure_privileged("drop all")?;
            let version = self.state.manager.drop_all();
            *self.state.schema.write() = Schema::default();
            info!(target: "bank::store", endpoint = %self.endpoint, version, "dropped all data");
        }
        if let Some(schema) = &operation.schema {
            self.ensure_privileged("alter schema")?;
            let mut installed = self.state.schema.write();
            for predicate in &schema.predicates {
                match installed.predicates.iter_mut().find(|p| p.name == predicate.name) {
                    Some(existing) => *existing = predicate.clone(),
                    None => installed.predicates.push(predicate.clone()),
                }
            }
            debug!(target: "bank::store", schema = %schema, "schema installed");
        }
        Ok(())
    }

    fn begin(&self, read_only: bool) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTxn {
            ctx: self.state.manager.begin(read_only),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Transaction handle returned by [`MemoryConnection::begin`]
pub struct MemoryTxn {
    ctx: TransactionContext,
    state: Arc<ClusterState>,
}

impl Transaction for MemoryTxn {
    fn txn_id(&self) -> u64 {
        self.ctx.txn_id
    }

    fn is_read_only(&self) -> bool {
        self.ctx.is_read_only()
    }

    fn query(&mut self, predicate: &Predicate) -> StoreResult<Vec<Account>> {
        self.ctx.ensure_active()?;
        let upsert = {
            let schema = self.state.schema.read();
            match schema.predicate(predicate.field()) {
                Some(def) if def.index => def.upsert,
                _ => {
                    return Err(StoreError::invalid_query(format!(
                        "predicate {} is not indexed",
                        predicate.field()
                    )))
                }
            }
        };
        self.ctx.query(predicate, upsert)
    }

    fn mutate(&mut self, mutation: &Mutation) -> StoreResult<Assigned> {
        self.ctx.mutate(mutation)
    }

    fn commit(&mut self) -> StoreResult<()> {
        if !self.ctx.is_active() {
            return Err(StoreError::TxnFinished {
                txn_id: self.ctx.txn_id,
            });
        }
        self.state.manager.commit(&mut self.ctx)?;
        Ok(())
    }

    fn discard(&mut self) -> StoreResult<()> {
        self.ctx.discard();
        Ok(())
    }
}
