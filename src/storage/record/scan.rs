use crate::common::types::{PageNo, Rid};
use crate::storage::page::layout::FIRST_RECORD_PAGE;
use crate::storage::record::error::RecordError;
use crate::storage::record::file_handle::RecordFileHandle;

/// Cursor over the live records of a file in (page, slot) order.
///
/// The cursor sits on the current record; `is_end()` holds once the slot
/// number equals the per-page capacity. Re-create it from the handle to
/// restart.
pub struct RecordScan<'a> {
    handle: &'a RecordFileHandle,
    rid: Rid,
    pending_error: Option<RecordError>,
}

impl<'a> RecordScan<'a> {
    pub fn new(handle: &'a RecordFileHandle) -> Result<Self, RecordError> {
        let mut scan = Self {
            handle,
            rid: Rid::new(FIRST_RECORD_PAGE, -1),
            pending_error: None,
        };
        scan.seek(FIRST_RECORD_PAGE, None)?;
        Ok(scan)
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn is_end(&self) -> bool {
        self.rid.slot_no as usize == self.capacity()
    }

    /// Move to the next live record, crossing into later pages as needed
    pub fn advance(&mut self) -> Result<(), RecordError> {
        if self.is_end() {
            return Ok(());
        }
        self.seek(self.rid.page_no, Some(self.rid.slot_no as usize))
    }

    fn capacity(&self) -> usize {
        self.handle.layout().num_records_per_page()
    }

    /// Position on the first live slot at or after `page_no`, strictly
    /// after `after` on that first page
    fn seek(&mut self, mut page_no: PageNo, mut after: Option<usize>) -> Result<(), RecordError> {
        let max_n = self.capacity();
        let num_pages = self.handle.num_pages();

        while page_no < num_pages {
            let slot = self.handle.with_page(page_no, |page| match after {
                Some(curr) => page.next_occupied(curr),
                None => page.first_occupied(),
            })?;
            if slot < max_n {
                self.rid = Rid::new(page_no, slot as i32);
                return Ok(());
            }
            page_no += 1;
            after = None;
        }

        self.rid = Rid::new((num_pages - 1).max(FIRST_RECORD_PAGE), max_n as i32);
        Ok(())
    }
}

impl Iterator for RecordScan<'_> {
    type Item = Result<Rid, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending_error.take() {
            self.rid.slot_no = self.capacity() as i32;
            return Some(Err(e));
        }
        if self.is_end() {
            return None;
        }

        let rid = self.rid;
        if let Err(e) = self.advance() {
            self.pending_error = Some(e);
        }
        Some(Ok(rid))
    }
}
