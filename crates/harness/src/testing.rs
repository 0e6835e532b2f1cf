//! Scripted store for unit tests
//!
//! A single-threaded stand-in that serves a fixed account list and fails
//! on demand, so tests can reach paths a real OCC store only hits under
//! races (duplicate keys, commit conflicts, discard failures).

use bank_core::{
    Account, Assigned, Credentials, Mutation, Operation, Predicate, Store, StoreError,
    StoreResult, Transaction, Uid,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
struct Script {
    begin: Option<StoreError>,
    query: Option<StoreError>,
    commit: Option<StoreError>,
    discard: Option<StoreError>,
    conflicts: Option<fn(&StoreError) -> bool>,
    panic_on_query: bool,
}

struct Shared {
    accounts: Mutex<Vec<Account>>,
    alters: Mutex<Vec<Operation>>,
    mutations: Mutex<Vec<Mutation>>,
    commits: AtomicUsize,
    discards: AtomicUsize,
    next_uid: AtomicU64,
}

pub(crate) struct ScriptedStore {
    script: Arc<Script>,
    shared: Arc<Shared>,
}

/// Materialized account with the given raw uid
pub(crate) fn stored(uid: u64, key: u64, bal: u64) -> Account {
    let mut account = Account::new(key, bal);
    account.uid = Some(Uid::new(uid));
    account
}

impl ScriptedStore {
    pub(crate) fn new(accounts: Vec<Account>) -> Self {
        ScriptedStore {
            script: Arc::new(Script::default()),
            shared: Arc::new(Shared {
                accounts: Mutex::new(accounts),
                alters: Mutex::new(Vec::new()),
                mutations: Mutex::new(Vec::new()),
                commits: AtomicUsize::new(0),
                discards: AtomicUsize::new(0),
                next_uid: AtomicU64::new(1000),
            }),
        }
    }

    pub(crate) fn fail_begin(mut self, err: StoreError) -> Self {
        Arc::make_mut(&mut self.script).begin = Some(err);
        self
    }

    pub(crate) fn fail_query(mut self, err: StoreError) -> Self {
        Arc::make_mut(&mut self.script).query = Some(err);
        self
    }

    pub(crate) fn fail_commit(mut self, err: StoreError) -> Self {
        Arc::make_mut(&mut self.script).commit = Some(err);
        self
    }

    pub(crate) fn fail_discard(mut self, err: StoreError) -> Self {
        Arc::make_mut(&mut self.script).discard = Some(err);
        self
    }

    /// Replace the default conflict classification
    pub(crate) fn classify_conflicts(mut self, classify: fn(&StoreError) -> bool) -> Self {
        Arc::make_mut(&mut self.script).conflicts = Some(classify);
        self
    }

    pub(crate) fn panic_on_query(mut self) -> Self {
        Arc::make_mut(&mut self.script).panic_on_query = true;
        self
    }

    pub(crate) fn accounts(&self) -> Vec<Account> {
        self.shared.accounts.lock().clone()
    }

    pub(crate) fn alters(&self) -> Vec<Operation> {
        self.shared.alters.lock().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<Mutation> {
        self.shared.mutations.lock().clone()
    }

    pub(crate) fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub(crate) fn discards(&self) -> usize {
        self.shared.discards.load(Ordering::SeqCst)
    }
}

impl Store for ScriptedStore {
    fn endpoint(&self) -> &str {
        "scripted:0"
    }

    fn login(&self, _credentials: &Credentials) -> StoreResult<()> {
        Ok(())
    }

    fn alter(&self, operation: &Operation) -> StoreResult<()> {
        if operation.drop_all {
            self.shared.accounts.lock().clear();
        }
        self.shared.alters.lock().push(operation.clone());
        Ok(())
    }

    fn begin(&self, read_only: bool) -> StoreResult<Box<dyn Transaction>> {
        if let Some(err) = &self.script.begin {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedTxn {
            script: Arc::clone(&self.script),
            shared: Arc::clone(&self.shared),
            read_only,
            pending: Vec::new(),
        }))
    }

    fn is_conflict(&self, err: &StoreError) -> bool {
        match self.script.conflicts {
            Some(classify) => classify(err),
            None => err.is_conflict(),
        }
    }
}

struct ScriptedTxn {
    script: Arc<Script>,
    shared: Arc<Shared>,
    read_only: bool,
    pending: Vec<Mutation>,
}

impl Transaction for ScriptedTxn {
    fn txn_id(&self) -> u64 {
        1
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn query(&mut self, predicate: &Predicate) -> StoreResult<Vec<Account>> {
        if self.script.panic_on_query {
            panic!("scripted query panic");
        }
        if let Some(err) = &self.script.query {
            return Err(err.clone());
        }
        Ok(self
            .shared
            .accounts
            .lock()
            .iter()
            .filter(|a| predicate.matches(a))
            .cloned()
            .collect())
    }

    fn mutate(&mut self, mutation: &Mutation) -> StoreResult<Assigned> {
        if self.read_only {
            return Err(StoreError::ReadOnly { txn_id: 1 });
        }
        let mut mutation = mutation.clone();
        let mut assigned = Assigned::default();
        for account in mutation.set.iter_mut().filter(|a| a.uid.is_none()) {
            let uid = Uid::new(self.shared.next_uid.fetch_add(1, Ordering::SeqCst));
            account.uid = Some(uid);
            assigned.uids.insert(account.blank_label(), uid);
        }
        self.shared.mutations.lock().push(mutation.clone());
        self.pending.push(mutation);
        Ok(assigned)
    }

    fn commit(&mut self) -> StoreResult<()> {
        if let Some(err) = &self.script.commit {
            return Err(err.clone());
        }
        let mut accounts = self.shared.accounts.lock();
        for mutation in self.pending.drain(..) {
            for account in mutation.set {
                match accounts.iter_mut().find(|a| a.uid == account.uid) {
                    Some(existing) => *existing = account,
                    None => accounts.push(account),
                }
            }
            for account in mutation.delete {
                accounts.retain(|a| a.uid != account.uid);
            }
        }
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn discard(&mut self) -> StoreResult<()> {
        self.pending.clear();
        self.shared.discards.fetch_add(1, Ordering::SeqCst);
        match &self.script.discard {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
