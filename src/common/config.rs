use std::path::PathBuf;

use crate::storage::buffer::ReplacerPolicy;

/// Configuration for a kernel instance
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Directory holding the record files
    pub db_dir: PathBuf,

    /// Number of frames in the buffer pool
    pub buffer_pool_size: usize,

    /// Eviction policy used by the buffer pool
    pub replacer: ReplacerPolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from("data"),
            buffer_pool_size: 256,
            replacer: ReplacerPolicy::Lru,
        }
    }
}
