//! Mapped strategy: every core hashes, nothing is queued.
//!
//! The input and the signature file are both mapped whole. Workers claim block
//! indices from a shared [`WorkPartitioner`] and store each digest directly at
//! its index in the output mapping, so blocks may complete in any order.
//! The calling thread is one of the workers.

use std::thread::{self, ScopedJoinHandle};

use tracing::{debug, warn};

use crate::block::Layout;
use crate::config::WORKER_THREAD_NAME;
use crate::digest::BlockHasher;
use crate::engine::{OsThreads, Spawner, spawn_with_retry};
use crate::error::{Result, SignError};
use crate::mapping::{DigestSlots, InputRegion, OutputRegion};
use crate::partition::WorkPartitioner;
use crate::types::Tally;
use crate::ui::progress::Progress;

/// Hashes every block of `input` into `output` with up to `threads` workers.
///
/// Spawn failures are retried out of a shared budget of `threads - 1`
/// attempts; once it is spent the run continues with the workers it has.
///
/// # Errors
///
/// [`SignError::RegionMismatch`] if the regions do not match `layout`,
/// [`SignError::Consistency`] if fewer digests were stored than planned,
/// [`SignError::WorkerPanicked`] if a worker panicked, or the flush error of
/// the output mapping.
pub fn run(input: &InputRegion, output: &mut OutputRegion, layout: &Layout, threads: usize, hasher: &BlockHasher, progress: &Progress) -> Result<Tally> {
    if input.len() as u64 != layout.input_len() {
        return Err(SignError::RegionMismatch { region: "input", unit: "bytes", actual: input.len() as u64, expected: layout.input_len() });
    }
    if output.slots() as u64 != layout.block_count() {
        return Err(SignError::RegionMismatch { region: "output", unit: "digests", actual: output.slots() as u64, expected: layout.block_count() });
    }

    let partitioner = WorkPartitioner::new(layout.block_count());
    let data = input.as_slice();

    let tally = {
        let slots = output.digest_slots();
        let job = Job { data, slots: &slots, layout, partitioner: &partitioner, hasher, progress };
        sign_parallel(&job, threads, &mut OsThreads)?
    };

    output.flush()?;

    if tally.blocks_written != layout.block_count() {
        return Err(SignError::Consistency { read: layout.block_count(), written: tally.blocks_written });
    }

    Ok(tally)
}

/// Everything a worker borrows for the duration of a run.
struct Job<'a> {
    data: &'a [u8],
    slots: &'a DigestSlots<'a>,
    layout: &'a Layout,
    partitioner: &'a WorkPartitioner,
    hasher: &'a BlockHasher,
    progress: &'a Progress,
}

fn sign_parallel(job: &Job<'_>, threads: usize, spawner: &mut impl Spawner) -> Result<Tally> {
    thread::scope(|scope| {
        let wanted = threads.saturating_sub(1);
        let mut retries = wanted;
        let mut handles: Vec<ScopedJoinHandle<'_, Tally>> = Vec::with_capacity(wanted);

        while handles.len() < wanted {
            let name = format!("{WORKER_THREAD_NAME}-{}", handles.len() + 1);
            match spawn_with_retry(scope, spawner, &name, &mut retries, move || move || work(job)) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!(requested = threads, spawned = handles.len() + 1, error = %err, "continuing with fewer workers");
                    break;
                }
            }
        }

        let mut tally = work(job);
        for handle in handles {
            let worker = handle.join().map_err(|_| SignError::WorkerPanicked(WORKER_THREAD_NAME))?;
            tally.blocks_read += worker.blocks_read;
            tally.blocks_written += worker.blocks_written;
            tally.workers += worker.workers;
        }

        debug!(workers = tally.workers, blocks = tally.blocks_written, "mapped engine joined");
        Ok(tally)
    })
}

fn work(job: &Job<'_>) -> Tally {
    let mut tally = Tally { workers: 1, ..Tally::default() };

    for index in job.partitioner {
        let range = job.layout.block_range(index);
        // Ranges lie within the mapped input, which fits the address space.
        let block = &job.data[range.start as usize..range.end as usize];
        tally.blocks_read += 1;

        let digest = job.hasher.digest(block);
        // SAFETY: the partitioner yields each index exactly once per run.
        unsafe { job.slots.store(index as usize, digest) };
        tally.blocks_written += 1;

        job.progress.add(block.len() as u64);
    }

    tally
}
