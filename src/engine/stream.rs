//! Streaming strategy: bounded memory, two threads.
//!
//! The calling thread reads the input block by block straight into queue
//! slots. A dedicated hasher/writer thread digests every committed block and
//! appends the digest to the output. A full queue makes the reader sleep,
//! which bounds memory to the queue arena.

use std::io::{ErrorKind, Read, Write};
use std::sync::Mutex;
use std::thread;

use tracing::debug;

use crate::config::{STREAM_SPAWN_RETRIES, WRITER_THREAD_NAME};
use crate::digest::BlockHasher;
use crate::engine::{OsThreads, Spawner, spawn_with_retry};
use crate::error::{Result, SignError};
use crate::queue::{BoundedBlockQueue, Consumer, Producer};
use crate::types::Tally;
use crate::ui::progress::Progress;

/// Signs everything `input` yields into `output` through `queue`.
///
/// Returns once both threads are joined. A short final read becomes one
/// last, shorter block.
///
/// # Errors
///
/// The hasher/writer's error takes precedence over the reader's, since a
/// failed writer makes the reader stop with [`SignError::Disconnected`].
pub fn run<R, W>(input: R, output: W, queue: &mut BoundedBlockQueue, hasher: &BlockHasher, progress: &Progress) -> Result<Tally>
where
    R: Read,
    W: Write + Send,
{
    run_with(input, output, queue, hasher, progress, &mut OsThreads)
}

fn run_with<R, W>(input: R, output: W, queue: &mut BoundedBlockQueue, hasher: &BlockHasher, progress: &Progress, spawner: &mut impl Spawner) -> Result<Tally>
where
    R: Read,
    W: Write + Send,
{
    let (mut producer, consumer) = queue.split();
    // Parked here so a failed spawn attempt does not lose the consumer.
    let handoff = &Mutex::new(Some((consumer, output)));

    thread::scope(|scope| {
        let mut retries = STREAM_SPAWN_RETRIES;
        let writer = spawn_with_retry(scope, spawner, WRITER_THREAD_NAME, &mut retries, move || {
            move || match handoff.lock().ok().and_then(|mut parked| parked.take()) {
                Some((consumer, output)) => write_digests(consumer, output, hasher, progress),
                None => Ok(0),
            }
        })
        .map_err(|source| SignError::ThreadSpawn { name: WRITER_THREAD_NAME.to_owned(), source })?;

        let read = read_blocks(&mut producer, input);
        producer.complete();

        let written = writer.join().map_err(|_| SignError::WorkerPanicked(WRITER_THREAD_NAME))?;
        let blocks_written = written?;
        let blocks_read = read?;
        debug!(blocks_read, blocks_written, "streaming engine joined");

        Ok(Tally { blocks_read, blocks_written, workers: 2 })
    })
}

fn read_blocks<R: Read>(producer: &mut Producer<'_>, mut input: R) -> Result<u64> {
    let mut blocks = 0;
    loop {
        let slot = producer.slot();
        let block_size = slot.len();
        let filled = fill_block(&mut input, slot).map_err(SignError::read)?;
        if filled == 0 {
            break;
        }

        producer.commit(filled)?;
        blocks += 1;

        if filled < block_size {
            break;
        }
    }

    Ok(blocks)
}

/// Reads until `buf` is full or the input ends; returns the bytes read.
fn fill_block<R: Read>(input: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

fn write_digests<W: Write>(mut consumer: Consumer<'_>, mut output: W, hasher: &BlockHasher, progress: &Progress) -> Result<u64> {
    let mut written = 0;
    loop {
        if let Some(block) = consumer.peek() {
            let digest = hasher.digest(block);
            output.write_all(digest.as_bytes()).map_err(SignError::write)?;
            progress.add(block.len() as u64);
            consumer.release();
            written += 1;
        } else if consumer.is_done() {
            break;
        } else {
            thread::yield_now();
        }
    }

    output.flush().map_err(SignError::write)?;
    Ok(written)
}
