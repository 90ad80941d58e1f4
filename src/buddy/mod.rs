//! Buddy frame allocator module
//!
//! This module provides the buddy system implementation with:
//! - Frame-number block algebra (size, alignment, buddies)
//! - Sorted free lists threaded through an out-of-line link arena
//! - Splitting on allocation, coalescing on free, page reservation
//! - State dumps and statistics

pub mod block;
pub mod buddy_allocator;
pub mod descriptor;
pub mod free_areas;
pub mod free_list;
pub mod link_arena;
pub mod stats;

pub use block::FrameSpan;
pub use buddy_allocator::BuddyFrameAllocator;
pub use descriptor::{LinearFrameMap, PageDescriptor};
pub use free_areas::FreeAreas;
pub use free_list::{FreeList, FreeListIter};
pub use link_arena::LinkArena;
#[cfg(feature = "tracking")]
pub use stats::{BuddyStats, MemoryStatsReporter};
pub use stats::BuddyState;
