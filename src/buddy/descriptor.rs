//! Page descriptor handles
//!
//! A descriptor stands for exactly one physical page frame. The allocator only
//! ever holds handles; the descriptor records stay with the memory map.

use core::fmt;

use crate::FrameTranslator;

/// Handle to one page descriptor in the memory map.
///
/// Handles compare in address order of the descriptors they name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageDescriptor(usize);

impl PageDescriptor {
    /// Create a handle for the descriptor at `index` in the memory map.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of this descriptor in the memory map.
    pub const fn index(self) -> usize {
        self.0
    }

    /// The descriptor `count` entries after this one.
    pub const fn add(self, count: usize) -> Self {
        Self(self.0 + count)
    }
}

impl fmt::Debug for PageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageDescriptor({:#x})", self.0)
    }
}

/// Translator for a memory map whose descriptor `i` describes frame `first_pfn + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearFrameMap {
    first_pfn: u64,
}

impl LinearFrameMap {
    pub const fn new(first_pfn: u64) -> Self {
        Self { first_pfn }
    }

    pub const fn first_pfn(&self) -> u64 {
        self.first_pfn
    }
}

impl Default for LinearFrameMap {
    fn default() -> Self {
        Self::new(0)
    }
}

impl FrameTranslator for LinearFrameMap {
    fn descriptor_to_frame_number(&self, desc: PageDescriptor) -> u64 {
        self.first_pfn + desc.index() as u64
    }

    fn frame_number_to_descriptor(&self, pfn: u64) -> PageDescriptor {
        assert!(
            pfn >= self.first_pfn,
            "frame {:#x} is below the memory map base {:#x}",
            pfn,
            self.first_pfn
        );
        PageDescriptor::new((pfn - self.first_pfn) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_map_round_trip() {
        let map = LinearFrameMap::new(0x80);
        let desc = map.frame_number_to_descriptor(0x85);
        assert_eq!(desc, PageDescriptor::new(5));
        assert_eq!(map.descriptor_to_frame_number(desc), 0x85);
    }

    #[test]
    fn test_descriptor_ordering() {
        let a = PageDescriptor::new(3);
        assert!(a < a.add(1));
        assert_eq!(a.add(4).index(), 7);
    }

    #[test]
    #[should_panic]
    fn test_linear_map_rejects_frames_below_base() {
        LinearFrameMap::new(0x10).frame_number_to_descriptor(0x0f);
    }
}
