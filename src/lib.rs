// Bayun storage and concurrency kernel

pub mod common;
pub mod storage;
pub mod transaction;

// Re-export key items for convenient access
pub use common::KernelConfig;
pub use common::types::{FileId, PageId, PageNo, Rid, TxnId, PAGE_SIZE};
pub use storage::buffer::{BufferPoolError, BufferPoolManager, PageGuard, ReplacerPolicy};
pub use storage::disk::{DiskManager, DiskManagerError};
pub use storage::record::{RecordError, RecordFileHandle, RecordManager, RecordScan};
pub use transaction::{LockManager, Transaction, TransactionManager};
