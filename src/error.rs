//! Error kinds reported by a signing run.
//!
//! Everything except [`SignError::ThreadSpawn`] raised while spawning mapped
//! workers is fatal: the run stops and the error is returned to the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::queue::Disconnected;

pub type Result<T, E = SignError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SignError {
    /// A setting is malformed or below its minimum.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The input or output could not be opened, created or mapped.
    #[error("can't open file {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The streaming queue storage could not be allocated.
    #[error("can't allocate memory for {slots} blocks of {block_size} bytes each; try decreasing block size (-b) or blocks count (-c)")]
    Allocation { slots: usize, block_size: usize },

    /// A read or write failed in the middle of a run.
    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// The OS refused to start a thread.
    #[error("failed to spawn thread {name}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The number of blocks read differs from the number of digests written.
    #[error("blocks read: {read} blocks written: {written}")]
    Consistency { read: u64, written: u64 },

    /// A mapped region's size disagrees with the planned layout.
    #[error("mapped {region} holds {actual} {unit} but the layout needs {expected}")]
    RegionMismatch { region: &'static str, unit: &'static str, actual: u64, expected: u64 },

    /// The hasher/writer stopped consuming before the input was exhausted.
    #[error(transparent)]
    Disconnected(#[from] Disconnected),

    /// A worker thread panicked before it could report its tally.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

impl SignError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileOpen { path: path.into(), source }
    }

    pub(crate) fn read(source: io::Error) -> Self {
        Self::Io { context: "error reading input file", source }
    }

    pub(crate) fn write(source: io::Error) -> Self {
        Self::Io { context: "error writing to file", source }
    }
}
