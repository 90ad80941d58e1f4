//! Locked frame allocator.
//!
//! The buddy allocator leaves its free lists inconsistent between the single
//! list edits of a split or merge, so every mutating call must run with
//! preemption and local IRQs disabled. This wrapper holds such a critical
//! section for the duration of each call.

use core::sync::atomic::{AtomicBool, Ordering};

use kspin::SpinNoIrq;

use crate::{AllocError, AllocResult, BuddyState, PageAllocatorAlgorithm, PageDescriptor};

#[cfg(feature = "tracking")]
use crate::{BuddyFrameAllocator, BuddyStats, FrameTranslator};

#[cfg(feature = "log")]
use log::error;

/// A page allocator shared by the whole kernel, guarded by an IRQ-safe spinlock
pub struct LockedFrameAllocator<A> {
    inner: SpinNoIrq<A>,
    initialized: AtomicBool,
}

impl<A: PageAllocatorAlgorithm> LockedFrameAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self {
            inner: SpinNoIrq::new(inner),
            initialized: AtomicBool::new(false),
        }
    }

    /// Hand `count` contiguous descriptors starting at `first` to the allocator
    pub fn init(&self, first: PageDescriptor, count: usize) -> AllocResult {
        self.inner.lock().init(first, count)?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &'static str {
        self.inner.lock().name()
    }

    /// Allocate `2^order` contiguous pages
    pub fn alloc_pages(&self, order: usize) -> AllocResult<PageDescriptor> {
        if !self.is_initialized() {
            return Err(AllocError::NoMemory);
        }
        self.inner.lock().alloc_pages(order)
    }

    /// Free `2^order` contiguous pages starting at `desc`
    pub fn free_pages(&self, desc: PageDescriptor, order: usize) -> AllocResult {
        if !self.is_initialized() {
            error!("frame allocator: freeing {:?} before initializing", desc);
            return Err(AllocError::InvalidParam);
        }
        self.inner.lock().free_pages(desc, order)
    }

    /// Take the page `desc` out of the allocatable pool
    pub fn reserve_page(&self, desc: PageDescriptor) -> AllocResult {
        if !self.is_initialized() {
            error!("frame allocator: reserving {:?} before initializing", desc);
            return Err(AllocError::InvalidParam);
        }
        self.inner.lock().reserve_page(desc)
    }

    pub fn is_free(&self, desc: PageDescriptor, order: usize) -> AllocResult<bool> {
        self.inner.lock().is_free(desc, order)
    }

    pub fn dump_state(&self) -> BuddyState {
        self.inner.lock().dump_state()
    }

    /// Run `f` on the allocator inside one critical section, for sequences of
    /// calls that must not interleave with other callers
    pub fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

#[cfg(feature = "tracking")]
impl<M: FrameTranslator> LockedFrameAllocator<BuddyFrameAllocator<M>> {
    /// Get buddy allocator statistics
    pub fn get_stats(&self) -> BuddyStats {
        self.inner.lock().get_stats()
    }
}

impl<A: PageAllocatorAlgorithm + Default> Default for LockedFrameAllocator<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}
