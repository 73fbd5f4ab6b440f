use std::fmt;
use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page number inside a single file
pub type PageNo = i32;

/// Open file descriptor handed out by the disk manager
pub type FileId = i32;

/// Transaction ID type
pub type TxnId = u32;

/// Buffer pool frame ID type
pub type FrameId = usize;

/// Sentinel for "no page" in on-disk links and in empty frames
pub const INVALID_PAGE_NO: PageNo = -1;

/// Identity of a page: which file, which page inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub fd: FileId,
    pub page_no: PageNo,
}

impl PageId {
    pub fn new(fd: FileId, page_no: PageNo) -> Self {
        Self { fd, page_no }
    }

    pub fn invalid() -> Self {
        Self { fd: -1, page_no: INVALID_PAGE_NO }
    }

    pub fn is_valid(&self) -> bool {
        self.fd >= 0 && self.page_no >= 0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(fd={}, page={})", self.fd, self.page_no)
    }
}

/// Tuple identifier: the only record address exposed outside the record layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_no: PageNo,
    pub slot_no: i32,
}

impl Rid {
    pub fn new(page_no: PageNo, slot_no: i32) -> Self {
        Self { page_no, slot_no }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}

/// Page structure
#[derive(Debug, Clone)]
pub struct Page {
    pub data: Box<[u8; PAGE_SIZE]>,
    pub id: PageId,
}

impl Page {
    pub fn new(id: PageId) -> Self {
        Self {
            data: Box::new([0; PAGE_SIZE]),
            id,
        }
    }

    pub fn reset(&mut self, id: PageId) {
        self.data.fill(0);
        self.id = id;
    }
}

/// Smart pointer to a page
pub type PagePtr = Arc<RwLock<Page>>;
