//! Lock-free distribution of block indices to any number of workers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out every index in `0..block_count` exactly once.
///
/// A claim is a single `fetch_add`; any value at or past `block_count` means
/// there is no work left. Workers may finish indices in any order, which is
/// fine because each index owns a fixed output slot.
#[derive(Debug)]
pub struct WorkPartitioner {
    next: AtomicU64,
    block_count: u64,
}

impl WorkPartitioner {
    pub const fn new(block_count: u64) -> Self {
        Self { next: AtomicU64::new(0), block_count }
    }

    /// Raw claim: the pre-increment counter value, possibly past the end.
    #[inline]
    pub fn claim(&self) -> u64 {
        // Only uniqueness matters; the data each index refers to is
        // published by thread spawn/join, not by this counter.
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Next unclaimed block index, or `None` once all have been handed out.
    #[inline]
    pub fn next_block(&self) -> Option<u64> {
        let index = self.claim();
        (index < self.block_count).then_some(index)
    }
}

impl Iterator for &WorkPartitioner {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.next_block()
    }
}
