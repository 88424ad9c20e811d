//! vsign - block-granular content signatures for large files.
//!
//! A file is cut into fixed-size blocks and every block is reduced to a
//! fixed-width keyed digest. The digests, in block order, form the signature;
//! comparing two signatures shows which byte ranges of a file changed.
//!
//! Two engines produce identical signatures:
//! - streaming: a reader and a hasher/writer thread joined by a lock-free
//!   bounded queue, using `block_size * capacity` bytes of memory
//! - mapped: a worker pool claiming block indices from an atomic counter and
//!   writing digests straight into a memory-mapped signature file

pub mod app;
pub mod block;
pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod file;
pub mod mapping;
pub mod orchestrator;
pub mod partition;
pub mod queue;
pub mod types;
pub mod ui;

pub use error::{Result, SignError};
