use thiserror::Error;
use crate::common::types::PageId;
use crate::storage::disk::DiskManagerError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("Page {0} not found in buffer pool")]
    PageNotFound(PageId),
    #[error("Page {0} is not pinned")]
    PageNotPinned(PageId),
    #[error("Page {0} is pinned")]
    PagePinned(PageId),
    #[error("No free frames: every frame is pinned")]
    NoFreeFrames,
    #[error("Invalid page id {0}")]
    InvalidPageId(PageId),
    #[error("Disk manager error: {0}")]
    DiskManagerError(#[from] DiskManagerError),
}
