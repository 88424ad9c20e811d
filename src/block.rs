//! Block partitioning of an input file.
//!
//! Blocks are identified only by their zero-based index. Every block is
//! `block_size` bytes long except possibly the last, which covers whatever
//! remains of the input.

use std::ops::Range;

use crate::digest::DIGEST_SIZE;
use crate::error::{Result, SignError};

/// Sizing of one signing run, derived from the input length and block size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    input_len: u64,
    block_size: usize,
    block_count: u64,
    last_block_len: usize,
}

impl Layout {
    /// Computes the block count and last-block length for `input_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidArgument`] for a zero block size.
    pub fn new(input_len: u64, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(SignError::InvalidArgument("block size must be greater than zero".into()));
        }

        let size = block_size as u64;
        let block_count = input_len.div_ceil(size);
        let last_block_len = match input_len % size {
            0 if input_len == 0 => 0,
            0 => block_size,
            // Remainder of a division by a usize always fits a usize.
            rem => rem as usize,
        };

        Ok(Self { input_len, block_size, block_count, last_block_len })
    }

    #[inline]
    pub const fn input_len(&self) -> u64 {
        self.input_len
    }

    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub const fn block_count(&self) -> u64 {
        self.block_count
    }

    #[inline]
    pub const fn last_block_len(&self) -> usize {
        self.last_block_len
    }

    /// Exact length of the signature file in bytes.
    pub fn output_len(&self) -> Option<u64> {
        self.block_count.checked_mul(DIGEST_SIZE as u64)
    }

    /// Length of block `index`, which must be below [`Self::block_count`].
    #[inline]
    pub fn block_len(&self, index: u64) -> usize {
        debug_assert!(index < self.block_count);
        if index + 1 == self.block_count { self.last_block_len } else { self.block_size }
    }

    /// Byte range of block `index` within the input.
    pub fn block_range(&self, index: u64) -> Range<u64> {
        let start = index * self.block_size as u64;
        start..start + self.block_len(index) as u64
    }
}
