// Transaction concurrency module exports

pub mod lock_manager;
pub mod transaction;
pub mod transaction_manager;

// Public exports
pub use lock_manager::{GroupLockMode, LockDataId, LockDataType, LockError, LockManager, LockMode};
pub use transaction::{IsolationLevel, Transaction, TransactionError, TransactionState, WriteRecord};
pub use transaction_manager::TransactionManager;
