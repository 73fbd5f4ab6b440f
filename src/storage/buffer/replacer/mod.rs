mod clock;
mod lru;

pub use clock::ClockReplacer;
pub use lru::LRUReplacer;

use std::str::FromStr;

use crate::common::types::FrameId;

/// Tracks which frames may be evicted. A frame is evictable between an
/// `unpin` (pin count reached zero) and the next `pin` or `victim`.
pub trait Replacer: Send {
    /// Pick a frame to evict and stop tracking it
    fn victim(&mut self) -> Option<FrameId>;

    /// The frame is in use and must not be evicted
    fn pin(&mut self, frame_id: FrameId);

    /// The frame is no longer in use and may be evicted
    fn unpin(&mut self, frame_id: FrameId);

    /// Number of evictable frames
    fn size(&self) -> usize;
}

/// Eviction policy, chosen when the pool is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacerPolicy {
    #[default]
    Lru,
    Clock,
}

impl ReplacerPolicy {
    pub fn build(self, pool_size: usize) -> Box<dyn Replacer> {
        match self {
            ReplacerPolicy::Lru => Box::new(LRUReplacer::new(pool_size)),
            ReplacerPolicy::Clock => Box::new(ClockReplacer::new(pool_size)),
        }
    }
}

impl FromStr for ReplacerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(ReplacerPolicy::Lru),
            "clock" => Ok(ReplacerPolicy::Clock),
            other => Err(format!("unknown replacer policy '{}', expected lru or clock", other)),
        }
    }
}
