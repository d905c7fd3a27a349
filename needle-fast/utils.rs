/// Bit helpers for the 16-pixel Bresenham circle used by FAST

pub const CIRCLE_LEN: u32 = 16;

/// Rotate a 16-bit circle mask left, wrapping around
#[inline]
fn rotate_circle(mask: u16, by: u32) -> u16 {
    mask.rotate_left(by % CIRCLE_LEN)
}

/// Check whether `mask` (bit i = circle pixel i passes) contains a circular
/// run of at least `min_count` set bits.
///
/// A run of length n exists iff `mask & rot(mask, 1) & ... & rot(mask, n-1)`
/// is non-zero.
pub fn has_contiguous_arc(mask: u16, min_count: u32) -> bool {
    if min_count == 0 || min_count > CIRCLE_LEN {
        return false;
    }
    if min_count == CIRCLE_LEN {
        return mask == u16::MAX;
    }

    let mut run = mask;
    for i in 1..min_count {
        run &= rotate_circle(mask, i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

/// Length of the longest circular run of set bits
pub fn longest_arc(mask: u16) -> u32 {
    if mask == u16::MAX {
        return CIRCLE_LEN;
    }
    let mut best = 0;
    let mut current = 0;
    // Walk twice around to catch runs crossing bit 15 -> bit 0
    for i in 0..(CIRCLE_LEN * 2) {
        if mask & (1 << (i % CIRCLE_LEN)) != 0 {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best.min(CIRCLE_LEN)
}
