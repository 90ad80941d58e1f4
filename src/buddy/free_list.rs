//! Sorted free list threaded through the link arena
//!
//! The list itself only keeps its head and length; the links between blocks
//! live in the [`LinkArena`]. Blocks are kept in ascending descriptor order.

use super::{descriptor::PageDescriptor, link_arena::LinkArena};

/// Free list of one order
pub struct FreeList {
    head: Option<PageDescriptor>,
    len: usize,
}

impl FreeList {
    /// Create a new empty free list
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Insert a block in sorted order (ascending by descriptor).
    ///
    /// Returns the block now linking to `desc`, or `None` if `desc` became the
    /// head, so callers can keep editing around the insertion point.
    ///
    /// Panics if `desc` is already in the list.
    pub fn insert_sorted(
        &mut self,
        links: &mut LinkArena,
        desc: PageDescriptor,
    ) -> Option<PageDescriptor> {
        // Find insertion position
        let mut prev = None;
        let mut current = self.head;
        let mut visited = 0;

        while let Some(node) = current {
            if visited > self.len {
                panic!("cycle detected in free list during insert");
            }
            if node == desc {
                panic!("{:?} is already in the free list", desc);
            }
            if node > desc {
                break;
            }
            prev = current;
            current = links.next(node);
            visited += 1;
        }

        links.set_next(desc, current);
        match prev {
            Some(prev) => links.set_next(prev, Some(desc)),
            None => self.head = Some(desc),
        }

        self.len += 1;
        prev
    }

    /// Find a block in the list
    ///
    /// Returns (block, prev) where prev is the block before it (or None if head)
    pub fn find_with_prev(
        &self,
        links: &LinkArena,
        desc: PageDescriptor,
    ) -> Option<(PageDescriptor, Option<PageDescriptor>)> {
        let mut prev = None;
        let mut current = self.head;
        let mut visited = 0;

        while let Some(node) = current {
            if visited > self.len {
                panic!("cycle detected in free list during search");
            }
            // Early termination: list is sorted
            if node > desc {
                break;
            }
            if node == desc {
                return Some((node, prev));
            }
            prev = current;
            current = links.next(node);
            visited += 1;
        }

        None
    }

    /// Whether `desc` heads a block in this list
    pub fn contains(&self, links: &LinkArena, desc: PageDescriptor) -> bool {
        self.find_with_prev(links, desc).is_some()
    }

    /// Unlink `desc` from the list.
    ///
    /// Panics if `desc` is not in the list: the caller believed a block was free
    /// when it is not, so the free lists can no longer be trusted.
    pub fn remove(&mut self, links: &mut LinkArena, desc: PageDescriptor) {
        let prev = match self.find_with_prev(links, desc) {
            Some((_, prev)) => prev,
            None => panic!("{:?} is not in the free list", desc),
        };

        let next = links.take_next(desc);
        match prev {
            Some(prev) => links.set_next(prev, next),
            None => self.head = next,
        }
        self.len -= 1;
    }

    /// Lowest block in the list
    pub fn first(&self) -> Option<PageDescriptor> {
        self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Forget every block. The links must be reset separately.
    pub fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }

    /// Get iterator over the blocks, lowest first
    pub fn iter<'a>(&self, links: &'a LinkArena) -> FreeListIter<'a> {
        FreeListIter {
            links,
            current: self.head,
        }
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator for FreeList
pub struct FreeListIter<'a> {
    links: &'a LinkArena,
    current: Option<PageDescriptor>,
}

impl Iterator for FreeListIter<'_> {
    type Item = PageDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = self.links.next(node);
        Some(node)
    }
}
