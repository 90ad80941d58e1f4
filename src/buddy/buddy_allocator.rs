//! Buddy frame allocator
//!
//! Allocates power-of-two runs of page frames out of one contiguous region,
//! splitting larger blocks on allocation and coalescing free buddies on free.
//!
//! The allocator has no internal locking. Every mutating call must run inside
//! a critical section held by the caller (see [`LockedFrameAllocator`]).
//!
//! [`LockedFrameAllocator`]: crate::LockedFrameAllocator

use crate::{AllocError, AllocResult, FrameTranslator, PageAllocatorAlgorithm, MAX_ORDER};

#[cfg(feature = "log")]
use log::{debug, error, warn};

use super::{
    block::{self, block_size, FrameSpan},
    descriptor::{LinearFrameMap, PageDescriptor},
    free_areas::FreeAreas,
    free_list::FreeListIter,
    stats::BuddyState,
};

#[cfg(feature = "tracking")]
use super::stats::{BuddyStats, MemoryStatsReporter};

/// Buddy allocator over one contiguous run of page descriptors
///
/// Each free list holds disjoint, order-aligned blocks sorted by descriptor.
/// After every public call no two free buddies are left unmerged.
pub struct BuddyFrameAllocator<M: FrameTranslator = LinearFrameMap> {
    map: M,
    areas: FreeAreas,
}

impl<M: FrameTranslator> BuddyFrameAllocator<M> {
    /// Create an allocator that translates descriptors through `map`.
    ///
    /// It manages nothing until [`init`](Self::init) is called.
    pub const fn new(map: M) -> Self {
        Self {
            map,
            areas: FreeAreas::new(),
        }
    }

    pub fn translator(&self) -> &M {
        &self.map
    }

    /// Hand `count` contiguous descriptors starting at `first` to the allocator.
    ///
    /// The region is packed greedily into the largest blocks that fit and are
    /// aligned at the current position, so no buddies are left unmerged. Any
    /// previous state is discarded.
    pub fn init(&mut self, first: PageDescriptor, count: usize) -> AllocResult {
        debug!(
            "buddy allocator: initialising first={:?}, nr={:#x}",
            first, count
        );

        if count == 0 {
            error!("buddy allocator: no page descriptors to manage");
            return Err(AllocError::InvalidParam);
        }

        let first_pfn = self.map.descriptor_to_frame_number(first);
        let span = match FrameSpan::new(first_pfn, count as u64) {
            Some(span) => span,
            None => {
                error!(
                    "buddy allocator: region at frame {:#x} with {:#x} frames overflows",
                    first_pfn, count
                );
                return Err(AllocError::InvalidParam);
            }
        };
        self.areas.reset(first, span);

        let mut pfn = span.start();
        while pfn < span.end() {
            let remaining = span.end() - pfn;
            let order = (0..MAX_ORDER)
                .rev()
                .find(|&order| block::is_aligned(pfn, order) && block_size(order) <= remaining)
                .unwrap_or(0);
            self.areas
                .insert(order, self.map.frame_number_to_descriptor(pfn));
            pfn += block_size(order);
        }

        Ok(())
    }

    /// Allocate a block of `2^order` frames.
    ///
    /// Takes the lowest block of the smallest non-empty order at or above
    /// `order` and halves it until it has the requested size. The returned
    /// block is order-aligned and no longer reachable from any free list.
    pub fn alloc(&mut self, order: usize) -> AllocResult<PageDescriptor> {
        if order >= MAX_ORDER {
            warn!(
                "buddy allocator: order {} exceeds maximum order {}",
                order,
                MAX_ORDER - 1
            );
            return Err(AllocError::InvalidOrder);
        }

        let found = (order..MAX_ORDER)
            .find_map(|free_order| self.areas.first(free_order).map(|block| (free_order, block)));
        let Some((mut free_order, mut block)) = found else {
            debug!("buddy allocator: allocation failure: order {}", order);
            #[cfg(feature = "tracking")]
            MemoryStatsReporter::print_alloc_failure_stats(&self.get_stats(), order);
            return Err(AllocError::NoMemory);
        };

        // Split down to the requested order
        while free_order > order {
            block = self.split_block(block, free_order);
            free_order -= 1;
        }

        self.areas.remove(order, block);
        Ok(block)
    }

    /// Return the block of `2^order` frames starting at `desc`.
    ///
    /// The block is merged with its buddy for as long as the buddy is free.
    /// Freeing a block that overlaps free memory is rejected.
    pub fn free(&mut self, desc: PageDescriptor, order: usize) -> AllocResult {
        let pfn = self.check_block(desc, order)?;

        if self.overlaps_free(desc, pfn, order) {
            warn!(
                "buddy allocator: double free of {:?} (frame {:#x}) at order {}",
                desc, pfn, order
            );
            return Err(AllocError::NotAllocated);
        }

        self.areas.insert(order, desc);

        let mut block = desc;
        let mut order = order;
        while order < MAX_ORDER - 1 {
            match self.buddy_of(block, order) {
                Some(buddy) if self.areas.contains(order, buddy) => {}
                _ => break,
            }
            block = self.merge_block(block, order);
            order += 1;
        }

        debug_assert!(self.areas.contains(order, block));
        Ok(())
    }

    /// Take the single page `desc` out of the allocatable pool.
    ///
    /// The free block containing the page is split down to order 0, the page
    /// itself is removed and its split-off siblings stay free. The page comes
    /// back only through [`free`](Self::free) at order 0.
    pub fn reserve(&mut self, desc: PageDescriptor) -> AllocResult {
        if !self.areas.is_managed(desc) {
            warn!("buddy allocator: cannot reserve unmanaged {:?}", desc);
            return Err(AllocError::NotManaged);
        }

        let found = (0..MAX_ORDER)
            .rev()
            .find(|&order| self.containing_block(order, desc).is_some());
        let Some(mut order) = found else {
            warn!("buddy allocator: {:?} is not free, cannot reserve", desc);
            return Err(AllocError::NotFree);
        };

        while order > 0 {
            let block = match self.containing_block(order, desc) {
                Some(block) => block,
                None => panic!("lost the free block containing {:?} at order {}", desc, order),
            };
            self.split_block(block, order);
            order -= 1;
        }

        self.areas.remove(0, desc);
        Ok(())
    }

    /// Whether the block of `order` starting at `desc` is in the free list of `order`.
    pub fn is_free(&self, desc: PageDescriptor, order: usize) -> AllocResult<bool> {
        self.check_block(desc, order)?;
        Ok(self.areas.contains(order, desc))
    }

    /// Whether the page `desc` lies inside any free block.
    pub fn is_page_free(&self, desc: PageDescriptor) -> bool {
        self.areas.is_managed(desc)
            && (0..MAX_ORDER).any(|order| self.containing_block(order, desc).is_some())
    }

    /// Iterate over the free blocks of `order`, lowest first.
    pub fn free_blocks(&self, order: usize) -> AllocResult<FreeListIter<'_>> {
        if order >= MAX_ORDER {
            return Err(AllocError::InvalidOrder);
        }
        Ok(self.areas.iter(order))
    }

    /// Snapshot of every free list, also written to the debug log.
    pub fn dump_state(&self) -> BuddyState {
        let state = BuddyState::new(core::array::from_fn(|order| {
            self.areas
                .iter(order)
                .map(|desc| self.map.descriptor_to_frame_number(desc))
                .collect()
        }));

        debug!("BUDDY STATE:");
        for (_order, _blocks) in state.iter() {
            debug!("[{}] {:x?}", _order, _blocks);
        }

        state
    }

    /// Number of frames handed to `init`
    pub fn total_frames(&self) -> usize {
        self.areas.span().nr_frames() as usize
    }

    /// Number of frames currently in free blocks
    pub fn free_frames(&self) -> usize {
        self.areas.free_frames() as usize
    }

    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> BuddyStats {
        let mut stats = BuddyStats::new();
        stats.total_frames = self.total_frames();

        for order in 0..MAX_ORDER {
            let block_count = self.areas.block_count(order);
            stats.free_blocks_by_order[order] = block_count;
            stats.free_frames += block_count << order;
        }

        stats.used_frames = stats.total_frames.saturating_sub(stats.free_frames);
        stats
    }

    /// Validate a caller-supplied block, returning its frame number.
    fn check_block(&self, desc: PageDescriptor, order: usize) -> AllocResult<u64> {
        if order >= MAX_ORDER {
            warn!(
                "buddy allocator: order {} exceeds maximum order {}",
                order,
                MAX_ORDER - 1
            );
            return Err(AllocError::InvalidOrder);
        }
        if !self.areas.is_managed(desc) {
            warn!("buddy allocator: {:?} is not managed", desc);
            return Err(AllocError::NotManaged);
        }

        let pfn = self.map.descriptor_to_frame_number(desc);
        if !block::is_aligned(pfn, order) {
            warn!(
                "buddy allocator: frame {:#x} is not aligned for order {}",
                pfn, order
            );
            return Err(AllocError::Misaligned);
        }
        if !self.areas.span().contains_block(pfn, order) {
            warn!(
                "buddy allocator: order {} block at frame {:#x} runs past the managed region",
                order, pfn
            );
            return Err(AllocError::NotManaged);
        }
        Ok(pfn)
    }

    /// Whether any part of the block of `order` at `desc` is already free.
    fn overlaps_free(&self, desc: PageDescriptor, pfn: u64, order: usize) -> bool {
        // A free block of this order or above would contain the whole block
        if (order..MAX_ORDER).any(|o| self.containing_block(o, desc).is_some()) {
            return true;
        }
        // Smaller free blocks are aligned, so they lie entirely inside it
        let end = pfn + block_size(order);
        (0..order).any(|o| self.areas.has_block_in_range(&self.map, o, pfn, end))
    }

    fn containing_block(&self, order: usize, desc: PageDescriptor) -> Option<PageDescriptor> {
        self.areas.find_containing_block(&self.map, order, desc)
    }

    fn is_aligned(&self, desc: PageDescriptor, order: usize) -> bool {
        block::is_aligned(self.map.descriptor_to_frame_number(desc), order)
    }

    /// Buddy of the block of `order` at `desc`, or `None` at the top order or
    /// when the buddy would lie outside the managed region.
    fn buddy_of(&self, desc: PageDescriptor, order: usize) -> Option<PageDescriptor> {
        let buddy = block::buddy_of(self.map.descriptor_to_frame_number(desc), order)?;
        self.areas
            .span()
            .contains_block(buddy, order)
            .then(|| self.map.frame_number_to_descriptor(buddy))
    }

    /// Split the free block `desc` of `source_order` into two free halves one
    /// order below. Returns the left half.
    fn split_block(&mut self, desc: PageDescriptor, source_order: usize) -> PageDescriptor {
        assert!(source_order > 0, "cannot split an order-0 block");
        assert!(
            self.is_aligned(desc, source_order),
            "{:?} is not aligned for order {}",
            desc,
            source_order
        );

        self.areas.remove(source_order, desc);

        let target_order = source_order - 1;
        let buddy = match self.buddy_of(desc, target_order) {
            Some(buddy) => buddy,
            None => panic!("{:?} has no buddy at order {}", desc, target_order),
        };
        debug_assert!(buddy > desc);

        self.areas.insert(target_order, buddy);
        self.areas.insert(target_order, desc);
        desc
    }

    /// Merge the free block `desc` of `source_order` with its free buddy into
    /// one block of the next order. Returns the merged block.
    fn merge_block(&mut self, desc: PageDescriptor, source_order: usize) -> PageDescriptor {
        assert!(
            self.is_aligned(desc, source_order),
            "{:?} is not aligned for order {}",
            desc,
            source_order
        );

        let buddy = match self.buddy_of(desc, source_order) {
            Some(buddy) => buddy,
            None => panic!("{:?} has no buddy at order {}", desc, source_order),
        };

        self.areas.remove(source_order, buddy);
        self.areas.remove(source_order, desc);

        let target_order = source_order + 1;
        let merged = if self.is_aligned(desc, target_order) {
            desc
        } else {
            buddy
        };
        self.areas.insert(target_order, merged);
        merged
    }
}

impl<M: FrameTranslator + Default> Default for BuddyFrameAllocator<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M: FrameTranslator> PageAllocatorAlgorithm for BuddyFrameAllocator<M> {
    fn name(&self) -> &'static str {
        "buddy"
    }

    fn init(&mut self, first: PageDescriptor, count: usize) -> AllocResult {
        BuddyFrameAllocator::init(self, first, count)
    }

    fn alloc_pages(&mut self, order: usize) -> AllocResult<PageDescriptor> {
        self.alloc(order)
    }

    fn free_pages(&mut self, desc: PageDescriptor, order: usize) -> AllocResult {
        self.free(desc, order)
    }

    fn reserve_page(&mut self, desc: PageDescriptor) -> AllocResult {
        self.reserve(desc)
    }

    fn is_free(&self, desc: PageDescriptor, order: usize) -> AllocResult<bool> {
        BuddyFrameAllocator::is_free(self, desc, order)
    }

    fn dump_state(&self) -> BuddyState {
        BuddyFrameAllocator::dump_state(self)
    }
}
