//! Free-list link arena
//!
//! Holds the "next free block" link of every managed descriptor. The links are
//! kept out-of-line, indexed by descriptor handle, so a descriptor and a list
//! node never alias. A link only means "next free block of the same order" and
//! is `None` for the tail of a list and for every descriptor not heading a
//! free block.

use alloc::vec::Vec;

use super::descriptor::PageDescriptor;

/// Link storage for one contiguous run of descriptors.
pub struct LinkArena {
    /// First descriptor of the managed run
    base: PageDescriptor,
    /// `links[i]` is the link of descriptor `base + i`
    links: Vec<Option<PageDescriptor>>,
}

impl LinkArena {
    /// Create an empty arena (manages nothing until `reset()`)
    pub const fn new() -> Self {
        Self {
            base: PageDescriptor::new(0),
            links: Vec::new(),
        }
    }

    /// Start managing `count` descriptors beginning at `base`, all links cleared.
    pub fn reset(&mut self, base: PageDescriptor, count: usize) {
        self.base = base;
        self.links.clear();
        self.links.resize(count, None);
    }

    /// Number of managed descriptors
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Whether `desc` belongs to the managed run
    pub fn is_managed(&self, desc: PageDescriptor) -> bool {
        self.slot(desc).is_some()
    }

    /// Link of `desc`.
    ///
    /// Panics if `desc` is not managed: following a link out of the arena
    /// means a free list is corrupted.
    pub fn next(&self, desc: PageDescriptor) -> Option<PageDescriptor> {
        match self.slot(desc) {
            Some(idx) => self.links[idx],
            None => panic!("{:?} is not managed by this allocator", desc),
        }
    }

    /// Set the link of `desc`. Panics if `desc` is not managed.
    pub fn set_next(&mut self, desc: PageDescriptor, next: Option<PageDescriptor>) {
        match self.slot(desc) {
            Some(idx) => self.links[idx] = next,
            None => panic!("{:?} is not managed by this allocator", desc),
        }
    }

    /// Clear the link of `desc`, returning its old value.
    pub fn take_next(&mut self, desc: PageDescriptor) -> Option<PageDescriptor> {
        let next = self.next(desc);
        self.set_next(desc, None);
        next
    }

    fn slot(&self, desc: PageDescriptor) -> Option<usize> {
        let idx = desc.index().checked_sub(self.base.index())?;
        (idx < self.links.len()).then_some(idx)
    }
}

impl Default for LinkArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_reset() {
        let mut arena = LinkArena::new();
        assert!(arena.is_empty());

        arena.reset(PageDescriptor::new(0x10), 4);
        assert_eq!(arena.len(), 4);
        assert!(arena.is_managed(PageDescriptor::new(0x10)));
        assert!(arena.is_managed(PageDescriptor::new(0x13)));
        assert!(!arena.is_managed(PageDescriptor::new(0x0f)));
        assert!(!arena.is_managed(PageDescriptor::new(0x14)));
    }

    #[test]
    fn test_arena_links() {
        let mut arena = LinkArena::new();
        arena.reset(PageDescriptor::new(0), 8);

        let a = PageDescriptor::new(2);
        let b = PageDescriptor::new(6);
        arena.set_next(a, Some(b));
        assert_eq!(arena.next(a), Some(b));
        assert_eq!(arena.next(b), None);

        assert_eq!(arena.take_next(a), Some(b));
        assert_eq!(arena.next(a), None);

        // reset drops stale links
        arena.set_next(a, Some(b));
        arena.reset(PageDescriptor::new(0), 8);
        assert_eq!(arena.next(a), None);
    }

    #[test]
    #[should_panic]
    fn test_arena_rejects_unmanaged_descriptor() {
        let mut arena = LinkArena::new();
        arena.reset(PageDescriptor::new(0), 2);
        arena.set_next(PageDescriptor::new(2), None);
    }
}
