use crate::common::types::FrameId;
use super::Replacer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockStatus {
    EmptyOrPinned,
    Untouched,
    Accessed,
}

/// Clock (second chance) page replacement policy.
///
/// Unpinned frames start as `Accessed`; the hand demotes them to `Untouched`
/// on its first pass and evicts them on the next.
pub struct ClockReplacer {
    circular: Vec<ClockStatus>,
    hand: usize,
}

impl ClockReplacer {
    pub fn new(pool_size: usize) -> Self {
        Self {
            circular: vec![ClockStatus::EmptyOrPinned; pool_size],
            hand: 0,
        }
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.circular.len();
    }
}

impl Replacer for ClockReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        if self.size() == 0 {
            return None;
        }

        // Every evictable frame is at worst demoted once, so two sweeps suffice
        for _ in 0..2 * self.circular.len() {
            match self.circular[self.hand] {
                ClockStatus::Accessed => self.circular[self.hand] = ClockStatus::Untouched,
                ClockStatus::Untouched => {
                    let frame_id = self.hand;
                    self.circular[frame_id] = ClockStatus::EmptyOrPinned;
                    self.advance();
                    return Some(frame_id);
                }
                ClockStatus::EmptyOrPinned => {}
            }
            self.advance();
        }
        None
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.circular[frame_id] = ClockStatus::EmptyOrPinned;
    }

    fn unpin(&mut self, frame_id: FrameId) {
        self.circular[frame_id] = ClockStatus::Accessed;
    }

    fn size(&self) -> usize {
        self.circular.iter().filter(|&&s| s != ClockStatus::EmptyOrPinned).count()
    }
}
