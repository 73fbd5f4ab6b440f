//! Scoped page handles.
//!
//! A guard holds one pin on its page and gives it back when dropped, on
//! every exit path.

use log::warn;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::types::{Page, PageId, PagePtr};
use super::manager::BufferPoolManager;

pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page: PagePtr,
    page_id: PageId,
    dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(super) fn new(bpm: &'a BufferPoolManager, page_id: PageId, page: PagePtr) -> Self {
        Self {
            bpm,
            page,
            page_id,
            dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Shared latch on the page bytes
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Exclusive latch on the page bytes; the page is unpinned dirty
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.dirty = true;
        self.page.write()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.bpm.unpin_page(self.page_id, self.dirty) {
            warn!("failed to unpin page {}: {}", self.page_id, e);
        }
    }
}
