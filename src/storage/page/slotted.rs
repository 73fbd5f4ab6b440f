use crate::common::types::{PageNo, PAGE_SIZE};
use crate::storage::page::bitmap;
use crate::storage::page::error::PageError;
use crate::storage::page::header::RecordPageHeader;
use crate::storage::page::layout::{RecordLayout, PAGE_HDR_SIZE};

/// Bounds-checked view of a page buffer as a slotted record page.
///
/// `B` is `&[u8]` for read access or `&mut [u8]` for updates; all offsets
/// come from the `RecordLayout`, which was validated against `PAGE_SIZE`.
pub struct SlottedPage<'a, B> {
    layout: &'a RecordLayout,
    data: B,
}

impl<'a, B: AsRef<[u8]>> SlottedPage<'a, B> {
    pub fn new(layout: &'a RecordLayout, data: B) -> Self {
        debug_assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { layout, data }
    }

    pub fn header(&self) -> RecordPageHeader {
        RecordPageHeader::from_bytes(&self.data.as_ref()[..PAGE_HDR_SIZE])
    }

    pub fn num_records(&self) -> usize {
        self.header().num_records.max(0) as usize
    }

    pub fn next_free_page_no(&self) -> PageNo {
        self.header().next_free_page_no
    }

    pub fn is_full(&self) -> bool {
        self.num_records() >= self.layout.num_records_per_page()
    }

    fn bitmap(&self) -> &[u8] {
        &self.data.as_ref()[self.layout.bitmap_range()]
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        slot < self.layout.num_records_per_page() && bitmap::is_set(self.bitmap(), slot)
    }

    /// First empty slot, if any
    pub fn first_free_slot(&self) -> Option<usize> {
        let max_n = self.layout.num_records_per_page();
        let slot = bitmap::first_bit(false, self.bitmap(), max_n);
        (slot < max_n).then_some(slot)
    }

    /// First occupied slot, or `num_records_per_page` when the page is empty
    pub fn first_occupied(&self) -> usize {
        bitmap::first_bit(true, self.bitmap(), self.layout.num_records_per_page())
    }

    /// Next occupied slot after `curr`, or `num_records_per_page`
    pub fn next_occupied(&self, curr: usize) -> usize {
        bitmap::next_bit(true, self.bitmap(), self.layout.num_records_per_page(), curr)
    }

    pub fn slot(&self, slot: usize) -> Result<&[u8], PageError> {
        let range = self.layout.slot_range(slot)?;
        Ok(&self.data.as_ref()[range])
    }
}

impl<'a, B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<'a, B> {
    /// Format an empty page that links to `next_free_page_no`
    pub fn init(&mut self, next_free_page_no: PageNo) {
        self.set_header(RecordPageHeader {
            num_records: 0,
            next_free_page_no,
        });
        let range = self.layout.bitmap_range();
        bitmap::init(&mut self.data.as_mut()[range]);
    }

    pub fn set_header(&mut self, header: RecordPageHeader) {
        self.data.as_mut()[..PAGE_HDR_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn set_next_free_page_no(&mut self, next_free_page_no: PageNo) {
        let mut header = self.header();
        header.next_free_page_no = next_free_page_no;
        self.set_header(header);
    }

    pub fn write_slot(&mut self, slot: usize, buf: &[u8]) -> Result<(), PageError> {
        if buf.len() != self.layout.record_size() {
            return Err(PageError::RecordSizeMismatch {
                expected: self.layout.record_size(),
                actual: buf.len(),
            });
        }
        let range = self.layout.slot_range(slot)?;
        self.data.as_mut()[range].copy_from_slice(buf);
        Ok(())
    }

    /// Mark a slot as holding a record. Returns false if it already was.
    pub fn occupy(&mut self, slot: usize) -> Result<bool, PageError> {
        self.layout.slot_range(slot)?;
        if self.is_occupied(slot) {
            return Ok(false);
        }
        let range = self.layout.bitmap_range();
        bitmap::set(&mut self.data.as_mut()[range], slot);
        let mut header = self.header();
        header.num_records += 1;
        self.set_header(header);
        Ok(true)
    }

    /// Mark a slot empty. Returns false if it already was.
    pub fn vacate(&mut self, slot: usize) -> Result<bool, PageError> {
        self.layout.slot_range(slot)?;
        if !self.is_occupied(slot) {
            return Ok(false);
        }
        let range = self.layout.bitmap_range();
        bitmap::reset(&mut self.data.as_mut()[range], slot);
        let mut header = self.header();
        header.num_records -= 1;
        self.set_header(header);
        Ok(true)
    }
}
