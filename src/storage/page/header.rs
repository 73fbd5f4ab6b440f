use byteorder::{ByteOrder, LittleEndian};
use crate::common::types::{PageNo, INVALID_PAGE_NO};
use crate::storage::page::layout::{FILE_HDR_SIZE, PAGE_HDR_SIZE};

/// Per-file metadata, stored at the start of page 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFileHeader {
    pub record_size: i32,
    pub num_records_per_page: i32,
    pub bitmap_size: i32,
    /// Includes the header page itself
    pub num_pages: i32,
    /// Head of the list of pages with at least one empty slot
    pub first_free_page_no: PageNo,
}

impl RecordFileHeader {
    // Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; FILE_HDR_SIZE] {
        let mut bytes = [0u8; FILE_HDR_SIZE];

        LittleEndian::write_i32(&mut bytes[0..4], self.record_size);
        LittleEndian::write_i32(&mut bytes[4..8], self.num_records_per_page);
        LittleEndian::write_i32(&mut bytes[8..12], self.bitmap_size);
        LittleEndian::write_i32(&mut bytes[12..16], self.num_pages);
        LittleEndian::write_i32(&mut bytes[16..20], self.first_free_page_no);

        bytes
    }

    // Deserialize header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            record_size: LittleEndian::read_i32(&bytes[0..4]),
            num_records_per_page: LittleEndian::read_i32(&bytes[4..8]),
            bitmap_size: LittleEndian::read_i32(&bytes[8..12]),
            num_pages: LittleEndian::read_i32(&bytes[12..16]),
            first_free_page_no: LittleEndian::read_i32(&bytes[16..20]),
        }
    }
}

/// Header at the start of every data page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPageHeader {
    pub num_records: i32,
    pub next_free_page_no: PageNo,
}

impl Default for RecordPageHeader {
    fn default() -> Self {
        Self {
            num_records: 0,
            next_free_page_no: INVALID_PAGE_NO,
        }
    }
}

impl RecordPageHeader {
    pub fn to_bytes(&self) -> [u8; PAGE_HDR_SIZE] {
        let mut bytes = [0u8; PAGE_HDR_SIZE];
        LittleEndian::write_i32(&mut bytes[0..4], self.num_records);
        LittleEndian::write_i32(&mut bytes[4..8], self.next_free_page_no);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            num_records: LittleEndian::read_i32(&bytes[0..4]),
            next_free_page_no: LittleEndian::read_i32(&bytes[4..8]),
        }
    }
}
