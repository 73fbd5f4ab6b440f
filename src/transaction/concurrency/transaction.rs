// BayunDB Transaction implementation
// Represents an active transaction: its 2PL phase, held locks and undo data

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{Rid, TxnId};
use crate::storage::record::{RecordError, RecordFileHandle};
use crate::transaction::concurrency::lock_manager::{LockDataId, LockError};

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    #[default]
    Serializable,
}

/// Transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Default,
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_finished(self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Aborted)
    }
}

/// Errors that can occur during transaction processing
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction {0} not found")]
    TransactionNotFound(TxnId),

    #[error("Transaction {0} is already running")]
    DuplicateTransaction(TxnId),

    #[error("Transaction {txn_id} is {state:?}")]
    InvalidState { txn_id: TxnId, state: TransactionState },

    #[error("Lock error: {0}")]
    LockError(#[from] LockError),

    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),
}

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, TransactionError>;

/// One modification made by a transaction, with what is needed to undo it
#[derive(Clone)]
pub enum WriteRecord {
    Insert {
        table: Arc<RecordFileHandle>,
        rid: Rid,
    },
    Delete {
        table: Arc<RecordFileHandle>,
        rid: Rid,
        old: Vec<u8>,
    },
    Update {
        table: Arc<RecordFileHandle>,
        rid: Rid,
        old: Vec<u8>,
    },
}

impl WriteRecord {
    pub fn table(&self) -> &Arc<RecordFileHandle> {
        match self {
            WriteRecord::Insert { table, .. }
            | WriteRecord::Delete { table, .. }
            | WriteRecord::Update { table, .. } => table,
        }
    }

    pub fn rid(&self) -> Rid {
        match self {
            WriteRecord::Insert { rid, .. }
            | WriteRecord::Delete { rid, .. }
            | WriteRecord::Update { rid, .. } => *rid,
        }
    }

    /// Apply the inverse of this modification
    pub fn undo(&self) -> std::result::Result<(), RecordError> {
        match self {
            WriteRecord::Insert { table, rid } => table.delete_record(*rid),
            WriteRecord::Delete { table, rid, old } => table.insert_record_at(*rid, old),
            WriteRecord::Update { table, rid, old } => table.update_record(*rid, old),
        }
    }
}

impl fmt::Debug for WriteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            WriteRecord::Insert { .. } => "Insert",
            WriteRecord::Delete { .. } => "Delete",
            WriteRecord::Update { .. } => "Update",
        };
        write!(f, "{} {} on fd {}", kind, self.rid(), self.table().fd())
    }
}

/// Transaction - shared between the executing thread and the managers
pub struct Transaction {
    /// Transaction ID
    id: TxnId,

    /// Isolation level for this transaction
    isolation_level: IsolationLevel,

    state: Mutex<TransactionState>,

    /// Resources this transaction has asked the lock manager for
    lock_set: Mutex<HashSet<LockDataId>>,

    /// Modifications in execution order
    write_set: Mutex<Vec<WriteRecord>>,
}

impl Transaction {
    pub fn new(id: TxnId, isolation_level: IsolationLevel) -> Self {
        Self {
            id,
            isolation_level,
            state: Mutex::new(TransactionState::Default),
            lock_set: Mutex::new(HashSet::new()),
            write_set: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock() = state;
    }

    pub(crate) fn add_lock(&self, lock_id: LockDataId) {
        self.lock_set.lock().insert(lock_id);
    }

    pub fn holds_lock(&self, lock_id: &LockDataId) -> bool {
        self.lock_set.lock().contains(lock_id)
    }

    /// Snapshot of the lock set
    pub fn lock_set(&self) -> Vec<LockDataId> {
        self.lock_set.lock().iter().copied().collect()
    }

    pub(crate) fn clear_lock_set(&self) {
        self.lock_set.lock().clear();
    }

    /// Log a modification so it can be undone on abort
    pub fn append_write_record(&self, record: WriteRecord) {
        self.write_set.lock().push(record);
    }

    pub fn write_set_len(&self) -> usize {
        self.write_set.lock().len()
    }

    /// Distinct record files touched by this transaction
    pub(crate) fn touched_tables(&self) -> Vec<Arc<RecordFileHandle>> {
        let mut tables: Vec<Arc<RecordFileHandle>> = Vec::new();
        for record in self.write_set.lock().iter() {
            if !tables.iter().any(|t| t.fd() == record.table().fd()) {
                tables.push(record.table().clone());
            }
        }
        tables
    }

    pub(crate) fn take_write_set(&self) -> Vec<WriteRecord> {
        std::mem::take(&mut *self.write_set.lock())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("isolation_level", &self.isolation_level)
            .field("locks", &self.lock_set.lock().len())
            .field("writes", &self.write_set.lock().len())
            .finish()
    }
}
