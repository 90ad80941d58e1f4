//! Free-list table
//!
//! One sorted free list per order, plus the link arena they are threaded
//! through and the span of frames they may contain.

use super::{
    block::{block_head, block_size, FrameSpan},
    descriptor::PageDescriptor,
    free_list::{FreeList, FreeListIter},
    link_arena::LinkArena,
};
use crate::{FrameTranslator, MAX_ORDER};

/// Free lists for all orders of one managed region
pub struct FreeAreas {
    lists: [FreeList; MAX_ORDER],
    links: LinkArena,
    span: FrameSpan,
}

impl FreeAreas {
    /// Create an empty table (manages nothing until `reset()`)
    pub const fn new() -> Self {
        Self {
            lists: [const { FreeList::new() }; MAX_ORDER],
            links: LinkArena::new(),
            span: FrameSpan::empty(),
        }
    }

    /// Drop every free block and start managing `span`, whose first frame is
    /// described by `first`.
    pub fn reset(&mut self, first: PageDescriptor, span: FrameSpan) {
        for list in &mut self.lists {
            list.clear();
        }
        self.links.reset(first, span.nr_frames() as usize);
        self.span = span;
    }

    pub fn span(&self) -> FrameSpan {
        self.span
    }

    /// Whether `desc` is one of the managed descriptors
    pub fn is_managed(&self, desc: PageDescriptor) -> bool {
        self.links.is_managed(desc)
    }

    /// Insert the block `desc` into the free list of `order`, keeping it sorted.
    ///
    /// Returns the block now linking to `desc` (`None` if it became the head).
    pub fn insert(&mut self, order: usize, desc: PageDescriptor) -> Option<PageDescriptor> {
        check_order(order);
        self.lists[order].insert_sorted(&mut self.links, desc)
    }

    /// Remove the block `desc` from the free list of `order`.
    ///
    /// The block must be present; a missing block panics.
    pub fn remove(&mut self, order: usize, desc: PageDescriptor) {
        check_order(order);
        self.lists[order].remove(&mut self.links, desc);
    }

    /// Whether the block `desc` is in the free list of `order`
    pub fn contains(&self, order: usize, desc: PageDescriptor) -> bool {
        check_order(order);
        self.lists[order].contains(&self.links, desc)
    }

    /// Find the free block of `order` that contains the page `desc`.
    ///
    /// Computes the order-aligned head of the block around `desc` and returns it
    /// only if that exact block is currently free.
    pub fn find_containing_block<M: FrameTranslator + ?Sized>(
        &self,
        map: &M,
        order: usize,
        desc: PageDescriptor,
    ) -> Option<PageDescriptor> {
        check_order(order);
        let head_pfn = block_head(map.descriptor_to_frame_number(desc), order);
        if !self.span.contains_block(head_pfn, order) {
            return None;
        }
        let head = map.frame_number_to_descriptor(head_pfn);
        self.contains(order, head).then_some(head)
    }

    /// Check if any block in the free list of `order` starts within the frame
    /// range [start, end)
    pub fn has_block_in_range<M: FrameTranslator + ?Sized>(
        &self,
        map: &M,
        order: usize,
        start: u64,
        end: u64,
    ) -> bool {
        for desc in self.iter(order) {
            let pfn = map.descriptor_to_frame_number(desc);
            // Early termination: list is sorted
            if pfn >= end {
                break;
            }
            if pfn >= start {
                return true;
            }
        }
        false
    }

    /// Lowest free block of `order`
    pub fn first(&self, order: usize) -> Option<PageDescriptor> {
        check_order(order);
        self.lists[order].first()
    }

    pub fn is_empty(&self, order: usize) -> bool {
        check_order(order);
        self.lists[order].is_empty()
    }

    /// Number of free blocks of `order`
    pub fn block_count(&self, order: usize) -> usize {
        check_order(order);
        self.lists[order].len()
    }

    /// Total number of free frames over all orders
    pub fn free_frames(&self) -> u64 {
        (0..MAX_ORDER)
            .map(|order| self.block_count(order) as u64 * block_size(order))
            .sum()
    }

    /// Iterate over the free blocks of `order`, lowest first
    pub fn iter(&self, order: usize) -> FreeListIter<'_> {
        check_order(order);
        self.lists[order].iter(&self.links)
    }
}

impl Default for FreeAreas {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn check_order(order: usize) {
    assert!(
        order < MAX_ORDER,
        "order {} exceeds maximum order {}",
        order,
        MAX_ORDER - 1
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearFrameMap;
    use alloc::vec::Vec;

    fn areas(first_pfn: u64, nr_frames: u64) -> FreeAreas {
        let mut areas = FreeAreas::new();
        areas.reset(
            PageDescriptor::new(0),
            FrameSpan::new(first_pfn, nr_frames).unwrap(),
        );
        areas
    }

    #[test]
    fn test_insert_remove_per_order() {
        let mut areas = areas(0, 32);

        areas.insert(2, PageDescriptor::new(8));
        areas.insert(2, PageDescriptor::new(0));
        areas.insert(0, PageDescriptor::new(5));

        assert_eq!(areas.block_count(2), 2);
        assert_eq!(areas.first(2), Some(PageDescriptor::new(0)));
        assert!(areas.contains(0, PageDescriptor::new(5)));
        assert!(!areas.contains(1, PageDescriptor::new(5)));
        assert_eq!(areas.free_frames(), 9);

        areas.remove(2, PageDescriptor::new(0));
        assert_eq!(
            areas.iter(2).collect::<Vec<_>>(),
            [PageDescriptor::new(8)]
        );
    }

    #[test]
    fn test_find_containing_block() {
        let map = LinearFrameMap::new(0);
        let mut areas = areas(0, 32);
        areas.insert(3, PageDescriptor::new(8));

        for idx in 8..16 {
            assert_eq!(
                areas.find_containing_block(&map, 3, PageDescriptor::new(idx)),
                Some(PageDescriptor::new(8))
            );
        }
        assert_eq!(
            areas.find_containing_block(&map, 3, PageDescriptor::new(16)),
            None
        );
        assert_eq!(
            areas.find_containing_block(&map, 2, PageDescriptor::new(9)),
            None
        );
    }

    #[test]
    fn test_find_containing_block_outside_span() {
        // frames [4, 12): the order-3 block around frame 5 starts at frame 0
        let map = LinearFrameMap::new(4);
        let areas = areas(4, 8);
        assert_eq!(
            areas.find_containing_block(&map, 3, PageDescriptor::new(1)),
            None
        );
    }

    #[test]
    fn test_has_block_in_range() {
        let map = LinearFrameMap::new(0);
        let mut areas = areas(0, 32);
        areas.insert(0, PageDescriptor::new(3));
        areas.insert(0, PageDescriptor::new(20));

        assert!(areas.has_block_in_range(&map, 0, 0, 4));
        assert!(!areas.has_block_in_range(&map, 0, 4, 20));
        assert!(areas.has_block_in_range(&map, 0, 16, 24));
    }

    #[test]
    fn test_reset_clears_lists() {
        let mut areas = areas(0, 16);
        areas.insert(4, PageDescriptor::new(0));
        areas.reset(PageDescriptor::new(0), FrameSpan::new(0, 16).unwrap());
        assert!(areas.is_empty(4));
        assert_eq!(areas.free_frames(), 0);
    }

    #[test]
    #[should_panic(expected = "exceeds maximum order")]
    fn test_order_out_of_range_panics() {
        let areas = areas(0, 16);
        areas.contains(MAX_ORDER, PageDescriptor::new(0));
    }
}
