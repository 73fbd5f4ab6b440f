//! Occupancy bitmap helpers. Bit `i` lives in byte `i / 8`, most
//! significant bit first.

const BITMAP_WIDTH: usize = 8;

fn mask(pos: usize) -> u8 {
    0x80 >> (pos % BITMAP_WIDTH)
}

pub fn init(bitmap: &mut [u8]) {
    bitmap.fill(0);
}

pub fn set(bitmap: &mut [u8], pos: usize) {
    bitmap[pos / BITMAP_WIDTH] |= mask(pos);
}

pub fn reset(bitmap: &mut [u8], pos: usize) {
    bitmap[pos / BITMAP_WIDTH] &= !mask(pos);
}

pub fn is_set(bitmap: &[u8], pos: usize) -> bool {
    bitmap[pos / BITMAP_WIDTH] & mask(pos) != 0
}

/// First position in `0..max_n` whose bit equals `bit`, or `max_n`
pub fn first_bit(bit: bool, bitmap: &[u8], max_n: usize) -> usize {
    (0..max_n).find(|&i| is_set(bitmap, i) == bit).unwrap_or(max_n)
}

/// First position after `curr` whose bit equals `bit`, or `max_n`
pub fn next_bit(bit: bool, bitmap: &[u8], max_n: usize, curr: usize) -> usize {
    (curr + 1..max_n).find(|&i| is_set(bitmap, i) == bit).unwrap_or(max_n)
}
