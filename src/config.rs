//! Global Configuration Constants
//!
//! Sizing limits, defaults and fixed parameters shared by the CLI, the
//! orchestrator and both signing engines.

use std::time::Duration;

use crate::digest::{DIGEST_SIZE, Seed};

/// Application name used in user interfaces and logs.
pub const APP_NAME: &str = "vsign";

/// Suffix appended to the input path when no output path is given.
pub const SIGNATURE_EXTENSION: &str = ".signature";

// === Block sizing ===

/// Smallest accepted block size in bytes.
///
/// A block may not be smaller than the digest it produces, otherwise the
/// signature would be larger than the file it describes.
pub const MIN_BLOCK_SIZE: usize = DIGEST_SIZE;

/// Block size used when `-b` is not given (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

// === Streaming queue ===

/// Smallest accepted queue capacity in blocks.
///
/// One slot is always owned by the producer while it fills it, so a single
/// slot could never hand anything to the consumer.
pub const MIN_QUEUE_CAPACITY: usize = 2;

/// Queue capacity used when `-c` is not given.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// How long the producer sleeps between checks while the queue is full.
pub const PRODUCER_BACKOFF: Duration = Duration::from_millis(1);

/// Extra spawn attempts for the streaming hasher/writer thread.
pub const STREAM_SPAWN_RETRIES: usize = 2;

// === Parallel engine ===

/// Smallest accepted worker count for the mapped strategy.
pub const MIN_THREADS: usize = 1;

/// Thread name prefix for mapped-strategy workers.
pub const WORKER_THREAD_NAME: &str = "vsign-worker";

/// Thread name for the streaming hasher/writer.
pub const WRITER_THREAD_NAME: &str = "vsign-writer";

// === Hashing ===

/// Seed every block digest is keyed with.
///
/// Changing it changes every signature ever produced, so it is part of the
/// output format.
pub const HASH_SEED: Seed = *b"vsign-block-signature-seed-00001";
