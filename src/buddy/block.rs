//! Block algebra
//!
//! Size, alignment and buddy computations for a block of a given order.
//! Everything here works on page frame numbers, never on descriptor addresses.

use crate::MAX_ORDER;

/// Number of frames in a block of `order`.
///
/// Panics if `order` is not in `0..MAX_ORDER`.
#[inline]
pub const fn block_size(order: usize) -> u64 {
    assert!(order < MAX_ORDER, "order out of range");
    1 << order
}

/// Whether frame `pfn` may start a block of `order`.
#[inline]
pub const fn is_aligned(pfn: u64, order: usize) -> bool {
    pfn & (block_size(order) - 1) == 0
}

/// Head of the block of `order` that contains frame `pfn`.
#[inline]
pub const fn block_head(pfn: u64, order: usize) -> u64 {
    pfn & !(block_size(order) - 1)
}

/// Returns the buddy of the block of `order` starting at `pfn`.
///
/// A block aligned for `order + 1` is the left half of its parent and its buddy
/// follows it; otherwise the buddy precedes it. Returns `None` for the top
/// order, where blocks have no buddy.
pub fn buddy_of(pfn: u64, order: usize) -> Option<u64> {
    assert!(
        is_aligned(pfn, order),
        "frame {:#x} is not aligned for order {}",
        pfn,
        order
    );
    if order + 1 >= MAX_ORDER {
        return None;
    }
    if is_aligned(pfn, order + 1) {
        pfn.checked_add(block_size(order))
    } else {
        // `pfn` has bit `order` set, so this cannot underflow
        Some(pfn - block_size(order))
    }
}

/// A contiguous range of frames handed to the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    start: u64,
    end: u64,
}

impl FrameSpan {
    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Span of `nr_frames` frames starting at `start`, or `None` if it overflows.
    pub fn new(start: u64, nr_frames: u64) -> Option<Self> {
        let end = start.checked_add(nr_frames)?;
        Some(Self { start, end })
    }

    pub const fn start(&self) -> u64 {
        self.start
    }

    pub const fn end(&self) -> u64 {
        self.end
    }

    pub const fn nr_frames(&self) -> u64 {
        self.end - self.start
    }

    pub const fn contains(&self, pfn: u64) -> bool {
        pfn >= self.start && pfn < self.end
    }

    /// Whether the whole block of `order` starting at `pfn` lies in this span.
    pub fn contains_block(&self, pfn: u64, order: usize) -> bool {
        match pfn.checked_add(block_size(order)) {
            Some(end) => pfn >= self.start && end <= self.end,
            None => false,
        }
    }
}
