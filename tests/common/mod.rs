#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use tempfile::TempDir;

use bayun_kernel::common::types::FileId;
use bayun_kernel::storage::buffer::{BufferPoolManager, ReplacerPolicy};
use bayun_kernel::storage::disk::DiskManager;
use bayun_kernel::storage::record::{RecordFileHandle, RecordManager};

// Create a buffer pool over one empty file in a temporary directory
pub fn create_test_buffer_pool(
    pool_size: usize,
    policy: ReplacerPolicy,
) -> Result<(Arc<BufferPoolManager>, FileId, TempDir)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("pool.db");
    let disk = Arc::new(DiskManager::new());
    disk.create_file(&path)?;
    let fd = disk.open_file(&path)?;
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, disk, policy));
    Ok((buffer_pool, fd, dir))
}

/// A record file opened in a temporary directory
pub struct TestTable {
    pub dir: TempDir,
    pub path: PathBuf,
    pub buffer_pool: Arc<BufferPoolManager>,
    pub record_manager: RecordManager,
    pub table: Arc<RecordFileHandle>,
}

impl TestTable {
    // Close the table and open it again through a fresh buffer pool
    pub fn reopen(self, pool_size: usize) -> Result<TestTable> {
        self.record_manager.close_file(&self.table)?;
        let disk = Arc::new(DiskManager::new());
        let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, disk, ReplacerPolicy::Lru));
        let record_manager = RecordManager::new(buffer_pool.clone());
        let table = record_manager.open_file(&self.path)?;
        Ok(TestTable {
            dir: self.dir,
            path: self.path,
            buffer_pool,
            record_manager,
            table,
        })
    }
}

pub fn create_test_table(pool_size: usize, record_size: usize) -> Result<TestTable> {
    create_test_table_with(pool_size, record_size, ReplacerPolicy::Lru)
}

pub fn create_test_table_with(
    pool_size: usize,
    record_size: usize,
    policy: ReplacerPolicy,
) -> Result<TestTable> {
    let dir = TempDir::new()?;
    let path = dir.path().join("table.tbl");
    let disk = Arc::new(DiskManager::new());
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, disk, policy));
    let record_manager = RecordManager::new(buffer_pool.clone());
    record_manager.create_file(&path, record_size)?;
    let table = record_manager.open_file(&path)?;
    Ok(TestTable {
        dir,
        path,
        buffer_pool,
        record_manager,
        table,
    })
}

// Generate `size` bytes of test data
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

// A record of `size` bytes tagged with `seed`
pub fn make_record(seed: u32, size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; size];
    let tag = seed.to_le_bytes();
    let n = tag.len().min(size);
    buf[..n].copy_from_slice(&tag[..n]);
    for (i, b) in buf.iter_mut().enumerate().skip(n) {
        *b = (seed as usize + i) as u8;
    }
    buf
}
