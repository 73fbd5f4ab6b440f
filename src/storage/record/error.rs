use thiserror::Error;

use crate::common::types::{PageNo, Rid};
use crate::storage::buffer::BufferPoolError;
use crate::storage::disk::DiskManagerError;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record {0} not found")]
    RecordNotFound(Rid),
    #[error("Invalid record id {0}")]
    InvalidRid(Rid),
    #[error("Page {0} does not exist")]
    PageNotExist(PageNo),
    #[error("Page {0} is on the free list but has no empty slot")]
    CorruptFreeList(PageNo),
    #[error("Page error: {0}")]
    PageError(#[from] PageError),
    #[error("Buffer pool error: {0}")]
    BufferPoolError(#[from] BufferPoolError),
    #[error("Disk manager error: {0}")]
    DiskManagerError(#[from] DiskManagerError),
}
