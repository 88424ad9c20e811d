//! Single-producer single-consumer ring of fixed-size blocks.
//!
//! The queue owns one contiguous arena of `capacity * block_size` bytes. The
//! producer fills the slot under its cursor in place and commits it; the
//! consumer peeks the slot under its cursor and releases it once done. The
//! two cursors are the only synchronisation: the producer publishes with a
//! release store that the consumer acquires, and the consumer frees slots the
//! same way in the other direction.
//!
//! The slot the producer is filling is never readable, so at most
//! `capacity - 1` blocks are ever waiting for the consumer.
//!
//! [`BoundedBlockQueue::split`] hands out exactly one [`Producer`] and one
//! [`Consumer`], which is what makes the unsynchronised slot access sound.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use thiserror::Error;

use crate::config::{MIN_QUEUE_CAPACITY, PRODUCER_BACKOFF};
use crate::error::{Result, SignError};

/// The consumer half was dropped while the producer still had blocks to hand over.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("block consumer stopped before the input was exhausted")]
pub struct Disconnected;

pub struct BoundedBlockQueue {
    storage: Box<[UnsafeCell<u8>]>,
    lens: Box<[AtomicUsize]>,
    block_size: usize,
    capacity: usize,
    producer_head: AtomicUsize,
    consumer_head: AtomicUsize,
    exhausted: AtomicBool,
    disconnected: AtomicBool,
}

// SAFETY: slot bytes are only touched through `Producer` and `Consumer`, of
// which `split` hands out one each, and the cursor protocol keeps them on
// different slots.
unsafe impl Sync for BoundedBlockQueue {}

impl BoundedBlockQueue {
    /// Allocates `capacity` slots of `block_size` bytes.
    ///
    /// # Errors
    ///
    /// [`SignError::InvalidArgument`] for a capacity below the minimum or a
    /// zero block size, [`SignError::Allocation`] when the arena cannot be
    /// allocated.
    pub fn new(block_size: usize, capacity: usize) -> Result<Self> {
        if capacity < MIN_QUEUE_CAPACITY {
            return Err(SignError::InvalidArgument(format!("queue capacity is {capacity} but minimal blocks count is {MIN_QUEUE_CAPACITY}")));
        }
        if block_size == 0 {
            return Err(SignError::InvalidArgument("block size must be greater than zero".into()));
        }

        let alloc_error = || SignError::Allocation { slots: capacity, block_size };
        let total = block_size.checked_mul(capacity).ok_or_else(alloc_error)?;

        let mut storage = Vec::new();
        storage.try_reserve_exact(total).map_err(|_| alloc_error())?;
        storage.resize_with(total, || UnsafeCell::new(0));

        let lens = (0..capacity).map(|_| AtomicUsize::new(0)).collect();

        Ok(Self {
            storage: storage.into_boxed_slice(),
            lens,
            block_size,
            capacity,
            producer_head: AtomicUsize::new(0),
            consumer_head: AtomicUsize::new(0),
            exhausted: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        })
    }

    /// Splits the queue into its two halves and resets it to empty.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        *self.producer_head.get_mut() = 0;
        *self.consumer_head.get_mut() = 0;
        *self.exhausted.get_mut() = false;
        *self.disconnected.get_mut() = false;

        let queue: &Self = self;
        (Producer { queue, _not_sync: PhantomData }, Consumer { queue, _not_sync: PhantomData })
    }

    #[inline]
    fn next(&self, slot: usize) -> usize {
        if slot + 1 == self.capacity { 0 } else { slot + 1 }
    }

    #[inline]
    fn slot_ptr(&self, slot: usize) -> *mut u8 {
        debug_assert!(slot < self.capacity);
        UnsafeCell::raw_get(self.storage[slot * self.block_size..].as_ptr())
    }
}

/// Writing half of a [`BoundedBlockQueue`].
pub struct Producer<'a> {
    queue: &'a BoundedBlockQueue,
    _not_sync: PhantomData<*mut ()>,
}

// SAFETY: the producer may move to another thread; it is just not shareable.
unsafe impl Send for Producer<'_> {}

impl Producer<'_> {
    /// Slot under the producer cursor, `block_size` bytes, to be filled in place.
    pub fn slot(&mut self) -> &mut [u8] {
        let queue = self.queue;
        let head = queue.producer_head.load(Ordering::Relaxed);
        // SAFETY: the consumer only reads slots strictly behind the producer
        // cursor, so nobody else can observe this slot until `commit`.
        unsafe { slice::from_raw_parts_mut(queue.slot_ptr(head), queue.block_size) }
    }

    /// Publishes the first `len` bytes of the current slot as the next block.
    ///
    /// Sleeps while the queue is full.
    ///
    /// # Errors
    ///
    /// [`Disconnected`] if the consumer went away while the queue was full.
    pub fn commit(&mut self, len: usize) -> Result<(), Disconnected> {
        let queue = self.queue;
        debug_assert!(len <= queue.block_size);

        let head = queue.producer_head.load(Ordering::Relaxed);
        queue.lens[head].store(len, Ordering::Relaxed);

        let next = queue.next(head);
        while queue.consumer_head.load(Ordering::Acquire) == next {
            if queue.disconnected.load(Ordering::Acquire) {
                return Err(Disconnected);
            }
            thread::sleep(PRODUCER_BACKOFF);
        }

        queue.producer_head.store(next, Ordering::Release);
        Ok(())
    }

    /// Signals that no further blocks will be committed.
    pub fn complete(self) {
        // Drop does the work.
    }
}

impl Drop for Producer<'_> {
    fn drop(&mut self) {
        self.queue.exhausted.store(true, Ordering::Release);
    }
}

/// Reading half of a [`BoundedBlockQueue`].
pub struct Consumer<'a> {
    queue: &'a BoundedBlockQueue,
    _not_sync: PhantomData<*mut ()>,
}

// SAFETY: see `Producer`.
unsafe impl Send for Consumer<'_> {}

impl Consumer<'_> {
    /// Oldest committed block, trimmed to its committed length.
    pub fn peek(&self) -> Option<&[u8]> {
        let queue = self.queue;
        let head = queue.consumer_head.load(Ordering::Relaxed);
        if queue.producer_head.load(Ordering::Acquire) == head {
            return None;
        }

        let len = queue.lens[head].load(Ordering::Relaxed);
        // SAFETY: the acquire above synchronises with the producer's commit,
        // and the producer will not write this slot again until `release`.
        Some(unsafe { slice::from_raw_parts(queue.slot_ptr(head), len) })
    }

    /// Hands the oldest block's slot back to the producer.
    pub fn release(&mut self) {
        let queue = self.queue;
        let head = queue.consumer_head.load(Ordering::Relaxed);
        debug_assert_ne!(head, queue.producer_head.load(Ordering::Acquire), "release on an empty queue");
        queue.consumer_head.store(queue.next(head), Ordering::Release);
    }

    /// True once the producer has completed and every block was released.
    pub fn is_done(&self) -> bool {
        let queue = self.queue;
        // Exhaustion is read first: once it is seen, the final commit is too.
        queue.exhausted.load(Ordering::Acquire) && queue.producer_head.load(Ordering::Acquire) == queue.consumer_head.load(Ordering::Relaxed)
    }
}

impl Drop for Consumer<'_> {
    fn drop(&mut self) {
        self.queue.disconnected.store(true, Ordering::Release);
    }
}
