use std::ops::Range;

use crate::common::types::{PageNo, PAGE_SIZE};
use crate::storage::page::error::PageError;
use crate::storage::page::header::RecordFileHeader;

pub const FILE_HDR_SIZE: usize = 20; // 4 bytes per field * 5 fields
pub const PAGE_HDR_SIZE: usize = 8; // num_records + next_free_page_no
pub const BITMAP_WIDTH: usize = 8;

/// Page 0 of every record file holds the file header
pub const FILE_HDR_PAGE: PageNo = 0;

/// First page that can hold records
pub const FIRST_RECORD_PAGE: PageNo = 1;

/// Geometry of a slotted page for one record size:
/// `[page header][bitmap][slot 0][slot 1]...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    record_size: usize,
    num_records_per_page: usize,
    bitmap_size: usize,
}

impl RecordLayout {
    /// Fit as many slots as possible, counting one bitmap bit per slot
    pub fn new(record_size: usize) -> Result<Self, PageError> {
        let usable = PAGE_SIZE - PAGE_HDR_SIZE;
        if record_size == 0 || record_size > usable - 1 {
            return Err(PageError::InvalidRecordSize(record_size));
        }

        let num_records_per_page = usable * BITMAP_WIDTH / (1 + BITMAP_WIDTH * record_size);
        let bitmap_size = num_records_per_page.div_ceil(BITMAP_WIDTH);

        Self::validated(record_size, num_records_per_page, bitmap_size)
    }

    /// Rebuild the layout persisted in a file header, rejecting anything
    /// that would address bytes outside the page
    pub fn from_header(header: &RecordFileHeader) -> Result<Self, PageError> {
        if header.record_size <= 0 || header.num_records_per_page <= 0 || header.bitmap_size <= 0 {
            return Err(PageError::CorruptHeader);
        }
        Self::validated(
            header.record_size as usize,
            header.num_records_per_page as usize,
            header.bitmap_size as usize,
        )
    }

    fn validated(record_size: usize, num_records_per_page: usize, bitmap_size: usize) -> Result<Self, PageError> {
        let fits = bitmap_size * BITMAP_WIDTH >= num_records_per_page
            && PAGE_HDR_SIZE + bitmap_size + num_records_per_page * record_size <= PAGE_SIZE;
        if num_records_per_page == 0 || !fits {
            return Err(PageError::CorruptHeader);
        }
        Ok(Self {
            record_size,
            num_records_per_page,
            bitmap_size,
        })
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn num_records_per_page(&self) -> usize {
        self.num_records_per_page
    }

    pub fn bitmap_size(&self) -> usize {
        self.bitmap_size
    }

    pub fn bitmap_range(&self) -> Range<usize> {
        PAGE_HDR_SIZE..PAGE_HDR_SIZE + self.bitmap_size
    }

    pub fn slot_range(&self, slot: usize) -> Result<Range<usize>, PageError> {
        if slot >= self.num_records_per_page {
            return Err(PageError::SlotOutOfRange(slot));
        }
        let start = PAGE_HDR_SIZE + self.bitmap_size + slot * self.record_size;
        Ok(start..start + self.record_size)
    }
}
