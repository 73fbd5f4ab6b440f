use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{FileId, PageNo, PAGE_SIZE};

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid page number: {0}")]
    InvalidPageNo(PageNo),
    #[error("File descriptor {0} is not open")]
    FileNotOpen(FileId),
    #[error("File {0} already exists")]
    FileExists(PathBuf),
    #[error("File {0} is still open")]
    FileInUse(PathBuf),
}

struct OpenFile {
    file: File,
    path: PathBuf,
    next_page_no: PageNo,
}

#[derive(Default)]
struct DiskState {
    files: HashMap<FileId, OpenFile>,
    next_fd: FileId,
}

/// DiskManager is responsible for handling the actual disk I/O operations.
/// Every open file gets a small integer descriptor; pages are addressed by
/// (descriptor, page number) and live at `page_no * PAGE_SIZE` in the file.
pub struct DiskManager {
    state: Mutex<DiskState>,
}

impl Default for DiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DiskState::default()),
        }
    }

    /// Create an empty file; fails if it already exists
    pub fn create_file(&self, path: impl AsRef<Path>) -> Result<(), DiskManagerError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(DiskManagerError::FileExists(path.to_path_buf()));
        }
        OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(())
    }

    /// Remove a file from disk; it must not be open
    pub fn destroy_file(&self, path: impl AsRef<Path>) -> Result<(), DiskManagerError> {
        let path = path.as_ref();
        let state = self.state.lock();
        if state.files.values().any(|f| f.path == path) {
            return Err(DiskManagerError::FileInUse(path.to_path_buf()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Open a file and return its descriptor. The page allocation counter
    /// starts right after the last full page currently on disk.
    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<FileId, DiskManagerError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_size = file.metadata()?.len();

        let mut state = self.state.lock();
        let fd = state.next_fd;
        state.next_fd += 1;
        state.files.insert(fd, OpenFile {
            file,
            path: path.to_path_buf(),
            next_page_no: (file_size / PAGE_SIZE as u64) as PageNo,
        });
        debug!("opened {} as fd {}", path.display(), fd);
        Ok(fd)
    }

    pub fn close_file(&self, fd: FileId) -> Result<(), DiskManagerError> {
        let open = self.state.lock().files.remove(&fd)
            .ok_or(DiskManagerError::FileNotOpen(fd))?;
        open.file.sync_all()?;
        Ok(())
    }

    /// Read a page from disk. Bytes past the end of the file read as zero.
    pub fn read_page(&self, fd: FileId, page_no: PageNo, buf: &mut [u8]) -> Result<(), DiskManagerError> {
        if page_no < 0 {
            return Err(DiskManagerError::InvalidPageNo(page_no));
        }

        let mut state = self.state.lock();
        let open = state.files.get_mut(&fd).ok_or(DiskManagerError::FileNotOpen(fd))?;
        let offset = Self::page_offset(page_no);
        let file_size = open.file.metadata()?.len();

        buf.fill(0);
        if offset >= file_size {
            return Ok(());
        }

        open.file.seek(SeekFrom::Start(offset))?;
        let available = ((file_size - offset) as usize).min(buf.len());
        open.file.read_exact(&mut buf[..available])?;
        Ok(())
    }

    /// Write a page to disk
    pub fn write_page(&self, fd: FileId, page_no: PageNo, buf: &[u8]) -> Result<(), DiskManagerError> {
        if page_no < 0 {
            return Err(DiskManagerError::InvalidPageNo(page_no));
        }

        let mut state = self.state.lock();
        let open = state.files.get_mut(&fd).ok_or(DiskManagerError::FileNotOpen(fd))?;
        open.file.seek(SeekFrom::Start(Self::page_offset(page_no)))?;
        open.file.write_all(buf)?;
        open.file.flush()?;
        Ok(())
    }

    /// Hand out the next page number of a file. Nothing is written until
    /// the page itself is flushed.
    pub fn allocate_page(&self, fd: FileId) -> Result<PageNo, DiskManagerError> {
        let mut state = self.state.lock();
        let open = state.files.get_mut(&fd).ok_or(DiskManagerError::FileNotOpen(fd))?;
        let page_no = open.next_page_no;
        open.next_page_no += 1;
        Ok(page_no)
    }

    /// Pages are never reclaimed; the call only records the release
    pub fn deallocate_page(&self, fd: FileId, page_no: PageNo) {
        debug!("deallocate page {} of fd {} (not reclaimed)", page_no, fd);
    }

    /// Overwrite the allocation counter, e.g. from a persisted page count
    pub fn set_next_page_no(&self, fd: FileId, page_no: PageNo) -> Result<(), DiskManagerError> {
        let mut state = self.state.lock();
        let open = state.files.get_mut(&fd).ok_or(DiskManagerError::FileNotOpen(fd))?;
        open.next_page_no = page_no;
        Ok(())
    }

    pub fn next_page_no(&self, fd: FileId) -> Result<PageNo, DiskManagerError> {
        let state = self.state.lock();
        let open = state.files.get(&fd).ok_or(DiskManagerError::FileNotOpen(fd))?;
        Ok(open.next_page_no)
    }

    fn page_offset(page_no: PageNo) -> u64 {
        page_no as u64 * PAGE_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_past_end_is_zeroed() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new();
        let fd = disk.open_file(dir.path().join("t.db")).unwrap();

        let mut buf = [7u8; PAGE_SIZE];
        disk.read_page(fd, 3, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::new();
        let fd = disk.open_file(dir.path().join("t.db")).unwrap();

        let mut page = [0u8; PAGE_SIZE];
        page[10..14].copy_from_slice(b"abcd");
        disk.write_page(fd, 2, &page).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        disk.read_page(fd, 2, &mut buf).unwrap();
        assert_eq!(&buf[10..14], b"abcd");
    }

    #[test]
    fn test_allocation_counter_seeded_from_file_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db");
        let disk = DiskManager::new();

        let fd = disk.open_file(&path).unwrap();
        assert_eq!(disk.allocate_page(fd).unwrap(), 0);
        assert_eq!(disk.allocate_page(fd).unwrap(), 1);
        disk.write_page(fd, 1, &[1u8; PAGE_SIZE]).unwrap();
        disk.close_file(fd).unwrap();

        let fd = disk.open_file(&path).unwrap();
        assert_eq!(disk.allocate_page(fd).unwrap(), 2);
    }

    #[test]
    fn test_unknown_fd() {
        let disk = DiskManager::new();
        let mut buf = [0u8; PAGE_SIZE];
        assert!(matches!(disk.read_page(42, 0, &mut buf), Err(DiskManagerError::FileNotOpen(42))));
    }

    #[test]
    fn test_destroy_open_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db");
        let disk = DiskManager::new();
        disk.create_file(&path).unwrap();
        let fd = disk.open_file(&path).unwrap();

        assert!(matches!(disk.destroy_file(&path), Err(DiskManagerError::FileInUse(_))));
        disk.close_file(fd).unwrap();
        disk.destroy_file(&path).unwrap();
        assert!(!path.exists());
    }
}
