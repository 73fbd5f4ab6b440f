use std::sync::Arc;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::common::types::{FileId, PageId, PageNo, Rid, INVALID_PAGE_NO};
use crate::storage::buffer::{BufferPoolManager, PageGuard};
use crate::storage::page::layout::{FILE_HDR_PAGE, FILE_HDR_SIZE, FIRST_RECORD_PAGE};
use crate::storage::page::{PageError, RecordFileHeader, RecordLayout, SlottedPage};
use crate::storage::record::error::RecordError;
use crate::storage::record::scan::RecordScan;

/// Fixed-size records in a file of slotted pages.
///
/// Page 0 holds the file header; pages with a free slot form a singly
/// linked list threaded through their page headers. Every page access goes
/// through a `PageGuard`, so pins are released on every exit path. The
/// header latch is held across inserts and deletes since both may move
/// pages on or off the free list.
pub struct RecordFileHandle {
    fd: FileId,
    layout: RecordLayout,
    file_hdr: Mutex<RecordFileHeader>,
    bpm: Arc<BufferPoolManager>,
}

impl RecordFileHandle {
    pub(crate) fn new(
        fd: FileId,
        file_hdr: RecordFileHeader,
        layout: RecordLayout,
        bpm: Arc<BufferPoolManager>,
    ) -> Self {
        Self {
            fd,
            layout,
            file_hdr: Mutex::new(file_hdr),
            bpm,
        }
    }

    pub fn fd(&self) -> FileId {
        self.fd
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn record_size(&self) -> usize {
        self.layout.record_size()
    }

    pub fn file_header(&self) -> RecordFileHeader {
        *self.file_hdr.lock()
    }

    pub fn num_pages(&self) -> PageNo {
        self.file_hdr.lock().num_pages
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    /// Record bytes at `rid`, or `None` if the slot is empty
    pub fn get_record(&self, rid: Rid) -> Result<Option<Vec<u8>>, RecordError> {
        let slot = self.slot_index(rid)?;
        let record = self.with_page(rid.page_no, |page| {
            if !page.is_occupied(slot) {
                return Ok(None);
            }
            page.slot(slot).map(|bytes| Some(bytes.to_vec()))
        })?;
        Ok(record?)
    }

    pub fn is_record(&self, rid: Rid) -> Result<bool, RecordError> {
        let slot = self.slot_index(rid)?;
        self.with_page(rid.page_no, |page| page.is_occupied(slot))
    }

    /// Store `buf` in the first empty slot of the first page with room
    pub fn insert_record(&self, buf: &[u8]) -> Result<Rid, RecordError> {
        self.check_size(buf)?;
        let mut hdr = self.file_hdr.lock();

        let mut guard = self.create_page_handle(&mut hdr)?;
        let page_no = guard.page_id().page_no;

        let (slot, now_full, next_free) = {
            let mut page = guard.write();
            let mut view = SlottedPage::new(&self.layout, &mut page.data[..]);
            let slot = view.first_free_slot().ok_or(RecordError::CorruptFreeList(page_no))?;
            view.write_slot(slot, buf)?;
            view.occupy(slot)?;
            (slot, view.is_full(), view.next_free_page_no())
        };

        if now_full {
            hdr.first_free_page_no = next_free;
            debug!("page {} of fd {} is full, free list head now {}", page_no, self.fd, next_free);
        }

        Ok(Rid::new(page_no, slot as i32))
    }

    pub fn delete_record(&self, rid: Rid) -> Result<(), RecordError> {
        let slot = self.slot_index(rid)?;
        let mut hdr = self.file_hdr.lock();

        let mut guard = self.fetch_page(&hdr, rid.page_no)?;
        if !SlottedPage::new(&self.layout, &guard.read().data[..]).is_occupied(slot) {
            return Err(RecordError::RecordNotFound(rid));
        }

        let was_full = {
            let mut page = guard.write();
            let mut view = SlottedPage::new(&self.layout, &mut page.data[..]);
            let was_full = view.is_full();
            view.vacate(slot)?;
            if was_full {
                view.set_next_free_page_no(hdr.first_free_page_no);
            }
            was_full
        };

        if was_full {
            hdr.first_free_page_no = rid.page_no;
            debug!("page {} of fd {} relinked onto free list", rid.page_no, self.fd);
        }

        Ok(())
    }

    /// Overwrite a live record in place
    pub fn update_record(&self, rid: Rid, buf: &[u8]) -> Result<(), RecordError> {
        self.check_size(buf)?;
        let slot = self.slot_index(rid)?;
        let hdr = self.file_header();

        let mut guard = self.fetch_page(&hdr, rid.page_no)?;
        if !SlottedPage::new(&self.layout, &guard.read().data[..]).is_occupied(slot) {
            return Err(RecordError::RecordNotFound(rid));
        }

        let mut page = guard.write();
        SlottedPage::new(&self.layout, &mut page.data[..]).write_slot(slot, buf)?;
        Ok(())
    }

    /// Put a record back at an exact location, growing the file if needed.
    /// Used by rollback, which must restore the original tuple id.
    pub fn insert_record_at(&self, rid: Rid, buf: &[u8]) -> Result<(), RecordError> {
        self.check_size(buf)?;
        let slot = self.slot_index(rid)?;
        if rid.page_no < FIRST_RECORD_PAGE {
            return Err(RecordError::PageNotExist(rid.page_no));
        }

        let mut hdr = self.file_hdr.lock();
        while hdr.num_pages <= rid.page_no {
            self.create_new_page_handle(&mut hdr)?;
        }

        let (became_full, next_free) = {
            let mut guard = self.fetch_page(&hdr, rid.page_no)?;
            let mut page = guard.write();
            let mut view = SlottedPage::new(&self.layout, &mut page.data[..]);
            view.write_slot(slot, buf)?;
            let newly_occupied = view.occupy(slot)?;
            (newly_occupied && view.is_full(), view.next_free_page_no())
        };

        if became_full {
            self.unlink_free_page(&mut hdr, rid.page_no, next_free)?;
        }

        Ok(())
    }

    /// Forward scan over all live records
    pub fn scan(&self) -> Result<RecordScan<'_>, RecordError> {
        RecordScan::new(self)
    }

    /// Persist the header and write every cached page of the file
    pub fn sync(&self) -> Result<(), RecordError> {
        let hdr = self.file_header();
        {
            let mut guard = self.bpm.fetch_page(PageId::new(self.fd, FILE_HDR_PAGE))?;
            guard.write().data[..FILE_HDR_SIZE].copy_from_slice(&hdr.to_bytes());
        }
        self.bpm.flush_all_pages(self.fd)?;
        Ok(())
    }

    /// Run `f` over a read-only view of a data page
    pub(crate) fn with_page<R>(
        &self,
        page_no: PageNo,
        f: impl FnOnce(&SlottedPage<'_, &[u8]>) -> R,
    ) -> Result<R, RecordError> {
        let hdr = self.file_header();
        let guard = self.fetch_page(&hdr, page_no)?;
        let page = guard.read();
        Ok(f(&SlottedPage::new(&self.layout, &page.data[..])))
    }

    fn fetch_page(&self, hdr: &RecordFileHeader, page_no: PageNo) -> Result<PageGuard<'_>, RecordError> {
        if page_no < FIRST_RECORD_PAGE || page_no >= hdr.num_pages {
            return Err(RecordError::PageNotExist(page_no));
        }
        Ok(self.bpm.fetch_page(PageId::new(self.fd, page_no))?)
    }

    /// Head of the free list, or a brand new page if the list is empty
    fn create_page_handle(&self, hdr: &mut RecordFileHeader) -> Result<PageGuard<'_>, RecordError> {
        if hdr.first_free_page_no == INVALID_PAGE_NO {
            return self.create_new_page_handle(hdr);
        }
        let page_no = hdr.first_free_page_no;
        self.fetch_page(hdr, page_no)
    }

    /// Append a formatted empty page and push it onto the free list
    fn create_new_page_handle(&self, hdr: &mut RecordFileHeader) -> Result<PageGuard<'_>, RecordError> {
        let mut guard = self.bpm.new_page(self.fd)?;
        let page_no = guard.page_id().page_no;
        {
            let mut page = guard.write();
            SlottedPage::new(&self.layout, &mut page.data[..]).init(hdr.first_free_page_no);
        }

        hdr.first_free_page_no = page_no;
        hdr.num_pages = hdr.num_pages.max(page_no + 1);
        debug!("fd {} grew to {} pages", self.fd, hdr.num_pages);
        Ok(guard)
    }

    /// Remove a page that just became full from wherever it sits in the free list
    fn unlink_free_page(&self, hdr: &mut RecordFileHeader, page_no: PageNo, next: PageNo) -> Result<(), RecordError> {
        if hdr.first_free_page_no == page_no {
            hdr.first_free_page_no = next;
            return Ok(());
        }

        let mut curr = hdr.first_free_page_no;
        for _ in 0..hdr.num_pages {
            if curr == INVALID_PAGE_NO {
                break;
            }
            let mut guard = self.fetch_page(hdr, curr)?;
            let curr_next = SlottedPage::new(&self.layout, &guard.read().data[..]).next_free_page_no();
            if curr_next == page_no {
                let mut page = guard.write();
                SlottedPage::new(&self.layout, &mut page.data[..]).set_next_free_page_no(next);
                return Ok(());
            }
            curr = curr_next;
        }

        warn!("page {} of fd {} was full but not on the free list", page_no, self.fd);
        Ok(())
    }

    fn slot_index(&self, rid: Rid) -> Result<usize, RecordError> {
        if rid.slot_no < 0 || rid.slot_no as usize >= self.layout.num_records_per_page() {
            return Err(RecordError::InvalidRid(rid));
        }
        Ok(rid.slot_no as usize)
    }

    fn check_size(&self, buf: &[u8]) -> Result<(), RecordError> {
        if buf.len() != self.layout.record_size() {
            return Err(PageError::RecordSizeMismatch {
                expected: self.layout.record_size(),
                actual: buf.len(),
            }
            .into());
        }
        Ok(())
    }
}
