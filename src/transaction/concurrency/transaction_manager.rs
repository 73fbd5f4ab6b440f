use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::common::types::TxnId;
use crate::transaction::concurrency::lock_manager::LockManager;
use crate::transaction::concurrency::transaction::{
    IsolationLevel, Result, Transaction, TransactionError, TransactionState,
};

/// Transaction manager - creates transactions and drives them to commit or abort
pub struct TransactionManager {
    /// Next transaction ID to assign
    next_txn_id: AtomicU32,

    /// Running transactions; entries leave on commit or abort
    txn_map: Mutex<HashMap<TxnId, Arc<Transaction>>>,

    lock_manager: Arc<LockManager>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>) -> Self {
        Self {
            next_txn_id: AtomicU32::new(1),
            txn_map: Mutex::new(HashMap::new()),
            lock_manager,
        }
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Register `txn`, or a fresh serializable transaction if none is given.
    ///
    /// A supplied transaction whose id is already running is rejected and the
    /// running one stays registered.
    pub fn begin(&self, txn: Option<Arc<Transaction>>) -> Result<Arc<Transaction>> {
        let txn = match txn {
            Some(txn) => txn,
            None => self.new_transaction(IsolationLevel::default()),
        };

        let mut txn_map = self.txn_map.lock();
        if txn_map.contains_key(&txn.id()) {
            warn!("txn {} is already running", txn.id());
            return Err(TransactionError::DuplicateTransaction(txn.id()));
        }
        self.next_txn_id.fetch_max(txn.id().saturating_add(1), Ordering::SeqCst);
        txn_map.insert(txn.id(), txn.clone());
        debug!("txn {} begins", txn.id());
        Ok(txn)
    }

    pub fn begin_with(&self, isolation_level: IsolationLevel) -> Result<Arc<Transaction>> {
        self.begin(Some(self.new_transaction(isolation_level)))
    }

    /// Make the transaction's writes durable, then release its locks.
    ///
    /// If flushing fails the transaction stays running with its write set
    /// intact, so the caller can still abort it.
    pub fn commit(&self, txn: &Transaction) -> Result<()> {
        Self::check_running(txn)?;

        for table in txn.touched_tables() {
            table.sync()?;
        }
        let writes = txn.take_write_set();

        self.release_locks(txn);
        txn.set_state(TransactionState::Committed);
        self.txn_map.lock().remove(&txn.id());

        info!("txn {} committed ({} writes)", txn.id(), writes.len());
        Ok(())
    }

    /// Undo the transaction's writes newest first, then release its locks.
    ///
    /// Locks are released and the state set even when an undo step fails;
    /// the first such failure is returned.
    pub fn abort(&self, txn: &Transaction) -> Result<()> {
        if txn.state() == TransactionState::Committed {
            return Err(TransactionError::InvalidState {
                txn_id: txn.id(),
                state: TransactionState::Committed,
            });
        }

        let writes = txn.take_write_set();
        let mut first_error = None;
        for record in writes.iter().rev() {
            if let Err(e) = record.undo() {
                warn!("txn {} failed to undo {:?}: {}", txn.id(), record, e);
                first_error.get_or_insert(e);
            }
        }

        self.release_locks(txn);
        txn.set_state(TransactionState::Aborted);
        self.txn_map.lock().remove(&txn.id());

        info!("txn {} aborted ({} writes rolled back)", txn.id(), writes.len());
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Commit a running transaction by id
    pub fn commit_transaction(&self, txn_id: TxnId) -> Result<()> {
        let txn = self.get_transaction(txn_id)
            .ok_or(TransactionError::TransactionNotFound(txn_id))?;
        self.commit(&txn)
    }

    /// Abort a running transaction by id
    pub fn abort_transaction(&self, txn_id: TxnId) -> Result<()> {
        let txn = self.get_transaction(txn_id)
            .ok_or(TransactionError::TransactionNotFound(txn_id))?;
        self.abort(&txn)
    }

    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.txn_map.lock().get(&txn_id).cloned()
    }

    pub fn active_transaction_ids(&self) -> Vec<TxnId> {
        let mut ids: Vec<TxnId> = self.txn_map.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn new_transaction(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        Arc::new(Transaction::new(txn_id, isolation_level))
    }

    fn check_running(txn: &Transaction) -> Result<()> {
        let state = txn.state();
        if state.is_finished() {
            return Err(TransactionError::InvalidState { txn_id: txn.id(), state });
        }
        Ok(())
    }

    fn release_locks(&self, txn: &Transaction) {
        for lock_id in txn.lock_set() {
            if let Err(e) = self.lock_manager.unlock(txn, lock_id) {
                warn!("txn {} could not release {}: {}", txn.id(), lock_id, e);
            }
        }
        txn.clear_lock_set();
    }
}
