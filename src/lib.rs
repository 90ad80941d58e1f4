//! Buddy Frame Allocator
//!
//! This crate implements the physical page-frame allocator of a kernel using the
//! binary buddy algorithm, featuring:
//! - Power-of-two, naturally aligned runs of page frames
//! - Automatic coalescing of free buddies on every free
//! - Reservation of individual pages out of larger free blocks
//! - Address-sorted free lists for reproducible state dumps
//!
//! The allocator never owns page descriptors. It is handed a contiguous run of
//! descriptors once, and translates between descriptors and frame numbers
//! through a caller-supplied [`FrameTranslator`].

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

use core::fmt;

/// Number of orders managed by the allocator.
///
/// Valid orders are `0..MAX_ORDER`, so the largest block spans `2^(MAX_ORDER - 1)` frames.
pub const MAX_ORDER: usize = 15;

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid parameter. (e.g. an empty region)
    InvalidParam,
    /// The order is not in `0..MAX_ORDER`.
    InvalidOrder,
    /// The descriptor is not aligned for the requested order.
    Misaligned,
    /// The descriptor or block lies outside the frames handed to `init`.
    NotManaged,
    /// No enough memory to allocate.
    NoMemory,
    /// Deallocate a region that is (partially) free already.
    NotAllocated,
    /// The page to reserve is not free.
    NotFree,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidParam => "invalid parameter",
            Self::InvalidOrder => "order out of range",
            Self::Misaligned => "block is not aligned for its order",
            Self::NotManaged => "block is not managed by this allocator",
            Self::NoMemory => "out of memory",
            Self::NotAllocated => "block is already free",
            Self::NotFree => "page is not free",
        };
        f.write_str(msg)
    }
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Translation between page descriptors and page frame numbers.
///
/// Provided by the memory-management subsystem. The two functions must be
/// mutual inverses over the managed range and must preserve ordering, i.e. a
/// higher descriptor maps to a higher frame number.
pub trait FrameTranslator {
    /// Returns the page frame number described by `desc`.
    fn descriptor_to_frame_number(&self, desc: PageDescriptor) -> u64;

    /// Returns the descriptor of page frame `pfn`.
    fn frame_number_to_descriptor(&self, pfn: u64) -> PageDescriptor;
}

/// Page-frame allocation algorithm, as used by the kernel's memory manager.
pub trait PageAllocatorAlgorithm {
    /// Friendly name of the algorithm, for debugging and selection purposes.
    fn name(&self) -> &'static str;

    /// Hand `count` contiguous descriptors starting at `first` to the allocator.
    fn init(&mut self, first: PageDescriptor, count: usize) -> AllocResult;

    /// Allocate `2^order` contiguous pages.
    fn alloc_pages(&mut self, order: usize) -> AllocResult<PageDescriptor>;

    /// Free `2^order` contiguous pages starting at `desc`.
    fn free_pages(&mut self, desc: PageDescriptor, order: usize) -> AllocResult;

    /// Take the single page `desc` out of the allocatable pool.
    fn reserve_page(&mut self, desc: PageDescriptor) -> AllocResult;

    /// Whether the block of `order` starting at `desc` is currently free.
    fn is_free(&self, desc: PageDescriptor, order: usize) -> AllocResult<bool>;

    /// Snapshot of every free list.
    fn dump_state(&self) -> BuddyState;
}

pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{BuddyFrameAllocator, BuddyState, LinearFrameMap, PageDescriptor};

pub mod locked;
pub use locked::LockedFrameAllocator;
