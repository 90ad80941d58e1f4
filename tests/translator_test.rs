//! Tests for a memory map whose descriptors do not start at frame zero,
//! driven through the locked allocator as a kernel would use it.

extern crate buddy_frame_allocator;

use buddy_frame_allocator::{
    AllocError, BuddyFrameAllocator, FrameTranslator, LockedFrameAllocator, PageDescriptor,
};

/// Descriptor index of the first managed page
const DESC_BASE: usize = 0x100;
/// Frame number of the first managed page
const PFN_BASE: u64 = 0x40;

/// Mock memory map: descriptors `DESC_BASE..` describe frames `PFN_BASE..`
#[derive(Default)]
struct MockFrameMap;

impl FrameTranslator for MockFrameMap {
    fn descriptor_to_frame_number(&self, desc: PageDescriptor) -> u64 {
        PFN_BASE + (desc.index() - DESC_BASE) as u64
    }

    fn frame_number_to_descriptor(&self, pfn: u64) -> PageDescriptor {
        assert!(pfn >= PFN_BASE, "frame {:#x} is not in the memory map", pfn);
        PageDescriptor::new(DESC_BASE + (pfn - PFN_BASE) as usize)
    }
}

fn desc_of(pfn: u64) -> PageDescriptor {
    MockFrameMap.frame_number_to_descriptor(pfn)
}

fn new_locked(nr_frames: usize) -> LockedFrameAllocator<BuddyFrameAllocator<MockFrameMap>> {
    let allocator = LockedFrameAllocator::new(BuddyFrameAllocator::new(MockFrameMap));
    allocator
        .init(PageDescriptor::new(DESC_BASE), nr_frames)
        .unwrap();
    allocator
}

#[test]
fn test_init_uses_frame_alignment() {
    // frames [0x40, 0x58): one order-4 block and one order-3 block
    let allocator = new_locked(24);
    let state = allocator.dump_state();
    assert_eq!(state.order(4), [0x40]);
    assert_eq!(state.order(3), [0x50]);
    assert_eq!(state.free_frames(), 24);
}

#[test]
fn test_alloc_returns_descriptors() {
    let allocator = new_locked(24);
    assert_eq!(allocator.alloc_pages(3), Ok(desc_of(0x50)));
    assert_eq!(allocator.alloc_pages(3), Ok(desc_of(0x40)));
    assert_eq!(allocator.alloc_pages(3), Ok(desc_of(0x48)));
    assert_eq!(allocator.alloc_pages(0), Err(AllocError::NoMemory));
}

#[test]
fn test_no_merge_past_region_end() {
    // the buddy of [0x40, 0x50) would be [0x50, 0x60), which runs past the region
    let allocator = new_locked(24);
    let block = allocator.alloc_pages(4).unwrap();
    assert_eq!(block, desc_of(0x40));
    allocator.free_pages(block, 4).unwrap();

    let state = allocator.dump_state();
    assert_eq!(state.order(4), [0x40]);
    assert!(state.order(5).is_empty());
}

#[test]
fn test_reserve_through_lock() {
    let allocator = new_locked(24);
    allocator.reserve_page(desc_of(0x53)).unwrap();
    assert_eq!(allocator.is_free(desc_of(0x53), 0), Ok(false));
    assert_eq!(
        allocator.reserve_page(desc_of(0x53)),
        Err(AllocError::NotFree)
    );

    let state = allocator.dump_state();
    assert_eq!(state.order(0), [0x52]);
    assert_eq!(state.order(1), [0x50]);
    assert_eq!(state.order(2), [0x54]);
    assert_eq!(state.order(4), [0x40]);

    allocator.free_pages(desc_of(0x53), 0).unwrap();
    assert_eq!(allocator.dump_state().order(3), [0x50]);
}

#[test]
fn test_unmanaged_descriptors_are_rejected() {
    let allocator = new_locked(24);
    assert_eq!(
        allocator.reserve_page(desc_of(0x58)),
        Err(AllocError::NotManaged)
    );
    assert_eq!(
        allocator.free_pages(PageDescriptor::new(DESC_BASE - 1), 0),
        Err(AllocError::NotManaged)
    );
    assert_eq!(
        allocator.is_free(desc_of(0x60), 0),
        Err(AllocError::NotManaged)
    );
}

#[test]
fn test_with_keeps_sequence_atomic() {
    let allocator = new_locked(24);
    let freed = allocator.with(|inner| {
        let block = inner.alloc(1)?;
        inner.reserve(block.add(2))?;
        inner.free(block, 1)?;
        Ok::<_, AllocError>(inner.free_frames())
    });
    assert_eq!(freed, Ok(23));
}
