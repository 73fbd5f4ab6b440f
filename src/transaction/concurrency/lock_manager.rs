// Multi-granularity two-phase lock manager

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::common::types::{FileId, Rid, TxnId};
use crate::transaction::concurrency::transaction::{Transaction, TransactionState};

/// Granularity of a lockable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockDataType {
    Table,
    Record,
}

/// Identifies a lockable resource: a whole table or one record in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockDataId {
    pub fd: FileId,
    pub rid: Option<Rid>,
    pub kind: LockDataType,
}

impl LockDataId {
    pub fn table(fd: FileId) -> Self {
        Self { fd, rid: None, kind: LockDataType::Table }
    }

    pub fn record(fd: FileId, rid: Rid) -> Self {
        Self { fd, rid: Some(rid), kind: LockDataType::Record }
    }
}

impl fmt::Display for LockDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rid {
            Some(rid) => write!(f, "record {} of fd {}", rid, self.fd),
            None => write!(f, "table fd {}", self.fd),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    IntentionShared,
    Shared,
    Update,
    IntentionExclusive,
    SharedIntentionExclusive,
    Exclusive,
}

impl LockMode {
    /// Least mode granting everything `self` and `other` grant
    pub fn join(self, other: LockMode) -> LockMode {
        use LockMode::*;
        match (self, other) {
            (a, b) if a == b => a,
            (IntentionShared, m) | (m, IntentionShared) => m,
            (Exclusive, _) | (_, Exclusive) => Exclusive,
            (Shared, Update) | (Update, Shared) => Update,
            (Shared, IntentionExclusive) | (IntentionExclusive, Shared) => SharedIntentionExclusive,
            (SharedIntentionExclusive, Shared | IntentionExclusive)
            | (Shared | IntentionExclusive, SharedIntentionExclusive) => SharedIntentionExclusive,
            // Update does not combine with intention-exclusive modes below X
            _ => Exclusive,
        }
    }

    /// Whether holding `self` already grants `other`
    pub fn covers(self, other: LockMode) -> bool {
        self.join(other) == self
    }
}

/// Summary of every granted request on one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupLockMode {
    #[default]
    NonLock,
    IS,
    S,
    U,
    IX,
    SIX,
    X,
}

impl From<LockMode> for GroupLockMode {
    fn from(mode: LockMode) -> Self {
        match mode {
            LockMode::IntentionShared => GroupLockMode::IS,
            LockMode::Shared => GroupLockMode::S,
            LockMode::Update => GroupLockMode::U,
            LockMode::IntentionExclusive => GroupLockMode::IX,
            LockMode::SharedIntentionExclusive => GroupLockMode::SIX,
            LockMode::Exclusive => GroupLockMode::X,
        }
    }
}

impl GroupLockMode {
    fn as_mode(self) -> Option<LockMode> {
        match self {
            GroupLockMode::NonLock => None,
            GroupLockMode::IS => Some(LockMode::IntentionShared),
            GroupLockMode::S => Some(LockMode::Shared),
            GroupLockMode::U => Some(LockMode::Update),
            GroupLockMode::IX => Some(LockMode::IntentionExclusive),
            GroupLockMode::SIX => Some(LockMode::SharedIntentionExclusive),
            GroupLockMode::X => Some(LockMode::Exclusive),
        }
    }

    /// Group mode after admitting `mode`
    pub fn join(self, mode: LockMode) -> GroupLockMode {
        match self.as_mode() {
            Some(held) => held.join(mode).into(),
            None => mode.into(),
        }
    }

    /// Whether a request for `mode` may be granted alongside this group
    pub fn admits(self, mode: LockMode) -> bool {
        use GroupLockMode as G;
        use LockMode::*;
        match mode {
            IntentionShared => self != G::X,
            Shared => matches!(self, G::NonLock | G::IS | G::S | G::U),
            Update => matches!(self, G::NonLock | G::IS | G::S),
            IntentionExclusive => matches!(self, G::NonLock | G::IS | G::IX),
            SharedIntentionExclusive => matches!(self, G::NonLock | G::IS),
            Exclusive => self == G::NonLock,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Transaction {0} is already aborted")]
    TransactionAborted(TxnId),

    #[error("Transaction {0} has already committed")]
    TransactionFinished(TxnId),

    #[error("Transaction {0} requested a lock after releasing one and was aborted")]
    LockOnShrinking(TxnId),

    #[error("Transaction {txn_id} holds no lock on {lock_id}")]
    LockNotHeld { txn_id: TxnId, lock_id: LockDataId },
}

#[derive(Debug, Clone, Copy)]
struct LockRequest {
    txn_id: TxnId,
    mode: LockMode,
    granted: bool,
}

#[derive(Debug, Default)]
struct LockRequestQueue {
    request_queue: Vec<LockRequest>,
    group_lock_mode: GroupLockMode,
    cv: Arc<Condvar>,
}

impl LockRequestQueue {
    /// Fold the granted requests, skipping those of `skip`
    fn granted_mode_excluding(&self, skip: Option<TxnId>) -> GroupLockMode {
        self.request_queue
            .iter()
            .filter(|r| r.granted && Some(r.txn_id) != skip)
            .fold(GroupLockMode::NonLock, |group, r| group.join(r.mode))
    }
}

/// Lock table shared by all transactions.
///
/// One latch guards the whole table; each resource has its own condition
/// variable. Waiters are woken together on every change and re-check their
/// own admissibility, so no admission order is promised.
#[derive(Default)]
pub struct LockManager {
    latch: Mutex<HashMap<LockDataId, LockRequestQueue>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `mode` on `lock_id` for `txn`, blocking until it is compatible
    /// with the other holders
    pub fn lock(&self, txn: &Transaction, lock_id: LockDataId, mode: LockMode) -> Result<(), LockError> {
        let txn_id = txn.id();
        let mut table = self.latch.lock();

        match txn.state() {
            TransactionState::Aborted => return Err(LockError::TransactionAborted(txn_id)),
            TransactionState::Committed => return Err(LockError::TransactionFinished(txn_id)),
            TransactionState::Shrinking => {
                txn.set_state(TransactionState::Aborted);
                warn!("txn {} asked for {:?} on {} while shrinking, aborting", txn_id, mode, lock_id);
                return Err(LockError::LockOnShrinking(txn_id));
            }
            _ => {}
        }
        txn.set_state(TransactionState::Growing);
        txn.add_lock(lock_id);

        let queue = table.entry(lock_id).or_default();
        let held = queue
            .request_queue
            .iter()
            .find(|r| r.txn_id == txn_id && r.granted)
            .map(|r| r.mode);

        let target = match held {
            Some(held) if held.covers(mode) => return Ok(()),
            Some(held) => held.join(mode),
            None => {
                queue.request_queue.push(LockRequest { txn_id, mode, granted: false });
                mode
            }
        };
        let cv = queue.cv.clone();

        loop {
            let others = table
                .get(&lock_id)
                .map_or(GroupLockMode::NonLock, |q| q.granted_mode_excluding(Some(txn_id)));
            if others.admits(target) {
                break;
            }
            debug!("txn {} waits for {:?} on {} (group {:?})", txn_id, target, lock_id, others);
            cv.wait(&mut table);
        }

        let queue = table.entry(lock_id).or_default();
        match queue.request_queue.iter_mut().find(|r| r.txn_id == txn_id) {
            Some(request) => {
                request.mode = target;
                request.granted = true;
            }
            None => queue.request_queue.push(LockRequest { txn_id, mode: target, granted: true }),
        }
        queue.group_lock_mode = match held {
            Some(_) => queue.granted_mode_excluding(None),
            None => queue.group_lock_mode.join(target),
        };
        trace!("txn {} granted {:?} on {}, group now {:?}", txn_id, target, lock_id, queue.group_lock_mode);

        queue.cv.notify_all();
        Ok(())
    }

    /// Release `txn`'s request on `lock_id`. The transaction's lock set is
    /// left for the caller to clear.
    pub fn unlock(&self, txn: &Transaction, lock_id: LockDataId) -> Result<(), LockError> {
        let txn_id = txn.id();
        let mut table = self.latch.lock();

        if !txn.holds_lock(&lock_id) {
            return Err(LockError::LockNotHeld { txn_id, lock_id });
        }
        if matches!(txn.state(), TransactionState::Default | TransactionState::Growing) {
            txn.set_state(TransactionState::Shrinking);
        }

        let Some(queue) = table.get_mut(&lock_id) else {
            return Ok(());
        };
        queue.request_queue.retain(|r| r.txn_id != txn_id);
        queue.group_lock_mode = queue.granted_mode_excluding(None);
        queue.cv.notify_all();
        trace!("txn {} released {}, group now {:?}", txn_id, lock_id, queue.group_lock_mode);

        if queue.request_queue.is_empty() {
            table.remove(&lock_id);
        }
        Ok(())
    }

    /// Current group mode of a resource; `NonLock` if nobody holds it
    pub fn group_mode(&self, lock_id: &LockDataId) -> GroupLockMode {
        self.latch
            .lock()
            .get(lock_id)
            .map_or(GroupLockMode::NonLock, |q| q.group_lock_mode)
    }

    pub fn lock_shared_on_record(&self, txn: &Transaction, rid: Rid, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::record(tab_fd, rid), LockMode::Shared)
    }

    pub fn lock_exclusive_on_record(&self, txn: &Transaction, rid: Rid, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::record(tab_fd, rid), LockMode::Exclusive)
    }

    pub fn lock_update_on_record(&self, txn: &Transaction, rid: Rid, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::record(tab_fd, rid), LockMode::Update)
    }

    pub fn lock_shared_on_table(&self, txn: &Transaction, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::table(tab_fd), LockMode::Shared)
    }

    pub fn lock_exclusive_on_table(&self, txn: &Transaction, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::table(tab_fd), LockMode::Exclusive)
    }

    pub fn lock_is_on_table(&self, txn: &Transaction, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::table(tab_fd), LockMode::IntentionShared)
    }

    pub fn lock_ix_on_table(&self, txn: &Transaction, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::table(tab_fd), LockMode::IntentionExclusive)
    }

    pub fn lock_six_on_table(&self, txn: &Transaction, tab_fd: FileId) -> Result<(), LockError> {
        self.lock(txn, LockDataId::table(tab_fd), LockMode::SharedIntentionExclusive)
    }
}
