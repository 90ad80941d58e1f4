//! State dumps, statistics and failure reporting for the buddy allocator

use alloc::vec::Vec;
use core::fmt;

use crate::MAX_ORDER;

/// Snapshot of the free lists: for each order, the ascending frame numbers of
/// its free blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuddyState {
    free_blocks: [Vec<u64>; MAX_ORDER],
}

impl BuddyState {
    pub(crate) fn new(free_blocks: [Vec<u64>; MAX_ORDER]) -> Self {
        Self { free_blocks }
    }

    /// Frame numbers of the free blocks of `order`, lowest first
    pub fn order(&self, order: usize) -> &[u64] {
        &self.free_blocks[order]
    }

    /// Iterate over `(order, blocks)` pairs, lowest order first
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u64])> {
        self.free_blocks
            .iter()
            .enumerate()
            .map(|(order, blocks)| (order, blocks.as_slice()))
    }

    /// Total number of free frames in the snapshot
    pub fn free_frames(&self) -> usize {
        self.iter()
            .map(|(order, blocks)| blocks.len() << order)
            .sum()
    }
}

impl fmt::Display for BuddyState {
    /// One line per order: `[order] pfn pfn ...`, frame numbers in hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (order, blocks) in self.iter() {
            write!(f, "[{}]", order)?;
            for pfn in blocks {
                write!(f, " {:x}", pfn)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Buddy system statistics
#[cfg(feature = "tracking")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_frames: usize,
    pub free_frames: usize,
    pub used_frames: usize,
    pub free_blocks_by_order: [usize; MAX_ORDER],
}

#[cfg(feature = "tracking")]
impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tracking")]
impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_frames: 0,
            free_frames: 0,
            used_frames: 0,
            free_blocks_by_order: [0; MAX_ORDER],
        }
    }

    /// Largest order with a free block, if any
    pub fn largest_free_order(&self) -> Option<usize> {
        (0..MAX_ORDER)
            .rev()
            .find(|&order| self.free_blocks_by_order[order] > 0)
    }
}

/// Detailed memory statistics reporter
#[cfg(feature = "tracking")]
pub struct MemoryStatsReporter;

#[cfg(feature = "tracking")]
impl MemoryStatsReporter {
    /// Print the free-list state after an allocation of `request_order` failed
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(stats: &BuddyStats, request_order: usize) {
        #[cfg(feature = "log")]
        use log::error;

        error!("========================================");
        error!(
            "Request: order {} ({} frames)",
            request_order,
            1usize << request_order
        );
        error!("  Total frames: {}", stats.total_frames);
        error!("  Free frames: {}", stats.free_frames);
        error!("  Used frames: {}", stats.used_frames);
        if let Some(order) = stats.largest_free_order() {
            error!("  Largest free order: {}", order);
        } else {
            error!("  No free blocks left");
        }
        error!("  Free blocks by order:");
        for order in (0..MAX_ORDER).rev() {
            let count = stats.free_blocks_by_order[order];
            if count > 0 {
                error!(
                    "    Order {}: {} blocks ({} frames total)",
                    order,
                    count,
                    count << order
                );
            }
        }
        error!("========================================");
    }
}
