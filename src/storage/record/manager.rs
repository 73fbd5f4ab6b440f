use std::path::Path;
use std::sync::Arc;
use log::{info, warn};

use crate::common::types::{FileId, INVALID_PAGE_NO, PAGE_SIZE};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::disk::DiskManager;
use crate::storage::page::layout::{FILE_HDR_PAGE, FILE_HDR_SIZE};
use crate::storage::page::{RecordFileHeader, RecordLayout};
use crate::storage::record::error::RecordError;
use crate::storage::record::file_handle::RecordFileHandle;

/// Creates, opens and closes record files
pub struct RecordManager {
    disk_manager: Arc<DiskManager>,
    bpm: Arc<BufferPoolManager>,
}

impl RecordManager {
    pub fn new(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            disk_manager: bpm.disk_manager(),
            bpm,
        }
    }

    /// Create a record file whose header page describes `record_size` records
    pub fn create_file(&self, path: impl AsRef<Path>, record_size: usize) -> Result<(), RecordError> {
        let path = path.as_ref();
        let layout = RecordLayout::new(record_size)?;
        let header = RecordFileHeader {
            record_size: layout.record_size() as i32,
            num_records_per_page: layout.num_records_per_page() as i32,
            bitmap_size: layout.bitmap_size() as i32,
            num_pages: 1,
            first_free_page_no: INVALID_PAGE_NO,
        };

        self.disk_manager.create_file(path)?;
        let fd = self.disk_manager.open_file(path)?;

        let mut page = [0u8; PAGE_SIZE];
        page[..FILE_HDR_SIZE].copy_from_slice(&header.to_bytes());
        self.disk_manager.write_page(fd, FILE_HDR_PAGE, &page)?;
        self.disk_manager.close_file(fd)?;

        info!(
            "created {} ({} byte records, {} per page)",
            path.display(),
            layout.record_size(),
            layout.num_records_per_page()
        );
        Ok(())
    }

    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<Arc<RecordFileHandle>, RecordError> {
        let fd = self.disk_manager.open_file(path)?;

        match self.load_header(fd) {
            Ok((header, layout)) => Ok(Arc::new(RecordFileHandle::new(fd, header, layout, self.bpm.clone()))),
            Err(e) => {
                if let Err(close_err) = self.disk_manager.close_file(fd) {
                    warn!("failed to close fd {} after bad open: {}", fd, close_err);
                }
                Err(e)
            }
        }
    }

    fn load_header(&self, fd: FileId) -> Result<(RecordFileHeader, RecordLayout), RecordError> {
        let mut page = [0u8; PAGE_SIZE];
        self.disk_manager.read_page(fd, FILE_HDR_PAGE, &mut page)?;
        let header = RecordFileHeader::from_bytes(&page[..FILE_HDR_SIZE]);
        let layout = RecordLayout::from_header(&header)?;

        // Pages allocated but never flushed still count
        self.disk_manager.set_next_page_no(fd, header.num_pages)?;
        Ok((header, layout))
    }

    /// Persist the header and all cached pages, then release the descriptor
    pub fn close_file(&self, handle: &RecordFileHandle) -> Result<(), RecordError> {
        handle.sync()?;
        self.disk_manager.close_file(handle.fd())?;
        Ok(())
    }

    pub fn destroy_file(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        self.disk_manager.destroy_file(path)?;
        Ok(())
    }
}
