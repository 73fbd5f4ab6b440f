use linked_hash_map::LinkedHashMap;

use crate::common::types::FrameId;
use super::Replacer;

/// LRU (Least Recently Used) page replacement policy.
///
/// The linked map doubles as the recency list and the frame lookup:
/// the front is the least recently unpinned frame, the back the most recent.
pub struct LRUReplacer {
    lru_list: LinkedHashMap<FrameId, ()>,
    max_size: usize,
}

impl LRUReplacer {
    pub fn new(pool_size: usize) -> Self {
        Self {
            lru_list: LinkedHashMap::with_capacity(pool_size),
            max_size: pool_size,
        }
    }
}

impl Replacer for LRUReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        self.lru_list.pop_front().map(|(frame_id, _)| frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.lru_list.remove(&frame_id);
    }

    fn unpin(&mut self, frame_id: FrameId) {
        // Re-unpinning a tracked frame keeps its original position
        if self.lru_list.contains_key(&frame_id) {
            return;
        }
        debug_assert!(self.lru_list.len() < self.max_size);
        self.lru_list.insert(frame_id, ());
    }

    fn size(&self) -> usize {
        self.lru_list.len()
    }
}
