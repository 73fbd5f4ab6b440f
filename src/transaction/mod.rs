// Transaction Management Module

pub mod concurrency;

// Public exports
pub use concurrency::{
    IsolationLevel, LockDataId, LockError, LockManager, LockMode, Transaction, TransactionError,
    TransactionManager, TransactionState, WriteRecord,
};
