use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};

use crate::common::config::KernelConfig;
use crate::common::types::{FileId, FrameId, Page, PageId, PagePtr};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::guard::PageGuard;
use crate::storage::buffer::replacer::{Replacer, ReplacerPolicy};
use crate::storage::disk::DiskManager;

/// Bookkeeping for one frame, guarded by the pool latch
#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    page_id: PageId,
    pin_count: u32,
    is_dirty: bool,
}

impl FrameMeta {
    fn empty() -> Self {
        Self {
            page_id: PageId::invalid(),
            pin_count: 0,
            is_dirty: false,
        }
    }
}

struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    frames: Vec<FrameMeta>,
    replacer: Box<dyn Replacer>,
}

/// Fixed-size page cache in front of the disk manager.
///
/// Page table, free list, pin counts and dirty flags all live behind one
/// mutex. Page bytes sit behind a per-frame `RwLock` and are only valid to
/// touch while the page is pinned, i.e. through a live [`PageGuard`].
/// Never call into the pool while holding a page latch.
pub struct BufferPoolManager {
    pool_size: usize,
    pages: Vec<PagePtr>,
    state: Mutex<PoolState>,
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>, policy: ReplacerPolicy) -> Self {
        let pages = (0..pool_size)
            .map(|_| Arc::new(RwLock::new(Page::new(PageId::invalid()))))
            .collect();

        Self {
            pool_size,
            pages,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list: (0..pool_size).collect(),
                frames: vec![FrameMeta::empty(); pool_size],
                replacer: policy.build(pool_size),
            }),
            disk_manager,
        }
    }

    pub fn with_config(config: &KernelConfig, disk_manager: Arc<DiskManager>) -> Self {
        Self::new(config.buffer_pool_size, disk_manager, config.replacer)
    }

    /// Fetch a page from the buffer pool or disk, pinning it
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageGuard<'_>, BufferPoolError> {
        if !page_id.is_valid() {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.frames[frame_id].pin_count += 1;
            state.replacer.pin(frame_id);
            return Ok(PageGuard::new(self, page_id, self.pages[frame_id].clone()));
        }

        let frame_id = self.find_victim_frame(state)?;
        {
            let mut page = self.pages[frame_id].write();
            if let Err(e) = self.disk_manager.read_page(page_id.fd, page_id.page_no, &mut page.data[..]) {
                page.reset(PageId::invalid());
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
            page.id = page_id;
        }

        state.page_table.insert(page_id, frame_id);
        state.frames[frame_id] = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
        state.replacer.pin(frame_id);
        trace!("loaded page {} into frame {}", page_id, frame_id);

        Ok(PageGuard::new(self, page_id, self.pages[frame_id].clone()))
    }

    /// Allocate a fresh zero-filled page in file `fd`, pinned once
    pub fn new_page(&self, fd: FileId) -> Result<PageGuard<'_>, BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = self.find_victim_frame(state)?;
        let page_no = match self.disk_manager.allocate_page(fd) {
            Ok(page_no) => page_no,
            Err(e) => {
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
        };

        let page_id = PageId::new(fd, page_no);
        self.pages[frame_id].write().reset(page_id);

        state.page_table.insert(page_id, frame_id);
        state.frames[frame_id] = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
        state.replacer.pin(frame_id);
        trace!("new page {} in frame {}", page_id, frame_id);

        Ok(PageGuard::new(self, page_id, self.pages[frame_id].clone()))
    }

    /// Drop one pin, marking the page dirty if requested. Fails if the page
    /// is not cached or was not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = *state.page_table.get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;
        let meta = &mut state.frames[frame_id];

        if meta.pin_count == 0 {
            return Err(BufferPoolError::PageNotPinned(page_id));
        }
        meta.is_dirty |= is_dirty;
        meta.pin_count -= 1;

        if meta.pin_count == 0 {
            state.replacer.unpin(frame_id);
        }

        Ok(())
    }

    /// Write a cached page to disk regardless of its pin count
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = *state.page_table.get(&page_id)
            .ok_or(BufferPoolError::PageNotFound(page_id))?;
        self.write_frame(frame_id, page_id)?;
        state.frames[frame_id].is_dirty = false;

        Ok(())
    }

    /// Write every cached page of file `fd` to disk
    pub fn flush_all_pages(&self, fd: FileId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();

        for frame_id in 0..self.pool_size {
            let page_id = state.frames[frame_id].page_id;
            if page_id.fd == fd && page_id.is_valid() {
                self.write_frame(frame_id, page_id)?;
                state.frames[frame_id].is_dirty = false;
            }
        }

        Ok(())
    }

    /// Drop a page from the pool and release it on disk. A page that is not
    /// cached is trivially deleted; a pinned page cannot be.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(()),
        };

        if state.frames[frame_id].pin_count > 0 {
            return Err(BufferPoolError::PagePinned(page_id));
        }

        self.disk_manager.deallocate_page(page_id.fd, page_id.page_no);
        state.page_table.remove(&page_id);
        state.frames[frame_id] = FrameMeta::empty();
        self.pages[frame_id].write().reset(PageId::invalid());
        state.replacer.pin(frame_id);
        state.free_list.push_back(frame_id);

        Ok(())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Frames that have never held a page (or were returned by `delete_page`)
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Frames the replacer may currently evict
    pub fn evictable_count(&self) -> usize {
        self.state.lock().replacer.size()
    }

    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state.page_table.get(&page_id).map(|&f| state.frames[f].pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state.page_table.get(&page_id).map(|&f| state.frames[f].is_dirty)
    }

    /// Get a reference to the disk manager
    pub fn disk_manager(&self) -> Arc<DiskManager> {
        self.disk_manager.clone()
    }

    /// Pick a frame for a new resident page: free list first, then the
    /// replacer. A dirty victim is written back and unmapped.
    fn find_victim_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.victim().ok_or(BufferPoolError::NoFreeFrames)?;
        let victim = state.frames[frame_id];
        debug_assert_eq!(victim.pin_count, 0);

        if victim.is_dirty {
            if let Err(e) = self.write_frame(frame_id, victim.page_id) {
                state.replacer.unpin(frame_id);
                return Err(e);
            }
            debug!("wrote back dirty page {} evicted from frame {}", victim.page_id, frame_id);
        }

        state.page_table.remove(&victim.page_id);
        state.frames[frame_id] = FrameMeta::empty();

        Ok(frame_id)
    }

    fn write_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<(), BufferPoolError> {
        let page = self.pages[frame_id].read();
        self.disk_manager.write_page(page_id.fd, page_id.page_no, &page.data[..])?;
        Ok(())
    }
}
