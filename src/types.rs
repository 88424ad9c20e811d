//! Common type definitions for vsign.
//!
//! - [`Strategy`]: which engine signs the file
//! - [`Settings`]: validated configuration of one run
//! - [`RunState`]: orchestrator progress, used for logging
//! - [`Tally`]: counters an engine reports back
//! - [`RunSummary`]: what a successful run hands to the caller

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::ValueEnum;
use strum::Display;

use crate::block::Layout;
use crate::config::{DEFAULT_BLOCK_SIZE, DEFAULT_QUEUE_CAPACITY, MIN_BLOCK_SIZE, MIN_QUEUE_CAPACITY, MIN_THREADS};
use crate::error::{Result, SignError};
use crate::file::File;

/// Concurrency strategy for a signing run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Strategy {
    /// Reader thread and hasher/writer thread joined by a bounded queue.
    #[default]
    Stream,

    /// Worker pool over memory-mapped input and output.
    Mapped,
}

/// Configuration of one signing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub block_size: usize,
    /// Streaming queue capacity in blocks.
    pub queue_capacity: usize,
    /// Mapped worker count, the calling thread included.
    pub threads: usize,
    pub strategy: Strategy,
    pub verbose: bool,
    /// Accepted for compatibility; verification is not implemented.
    pub verify: bool,
}

impl Settings {
    /// Defaults for `input`, writing to `input.signature`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = File::new(&input).signature_path();

        Self {
            input,
            output,
            block_size: DEFAULT_BLOCK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            threads: default_threads(),
            strategy: Strategy::default(),
            verbose: false,
            verify: false,
        }
    }

    /// Checks every minimum without touching the file system.
    ///
    /// # Errors
    ///
    /// [`SignError::InvalidArgument`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(SignError::InvalidArgument(format!(
                "you've set block size (-b) to {} bytes but minimal block size is {MIN_BLOCK_SIZE} bytes",
                self.block_size
            )));
        }
        if self.queue_capacity < MIN_QUEUE_CAPACITY {
            return Err(SignError::InvalidArgument(format!(
                "you've set blocks count (-c) to {} but minimal blocks count is {MIN_QUEUE_CAPACITY}",
                self.queue_capacity
            )));
        }
        if self.threads < MIN_THREADS {
            return Err(SignError::InvalidArgument(format!("you've set thread count (-t) to {} but minimal thread count is {MIN_THREADS}", self.threads)));
        }
        if self.input == self.output {
            return Err(SignError::InvalidArgument(format!("output file is the input file: {}", self.input.display())));
        }

        Ok(())
    }
}

/// Logical core count, or one if it cannot be determined.
pub fn default_threads() -> usize {
    thread::available_parallelism().map_or(MIN_THREADS, NonZeroUsize::get)
}

/// Orchestrator stages of a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum RunState {
    Init,
    SizingComputed,
    StoresOpened,
    WorkersRunning,
    AllJoined,
    Verified,
    Done,
    Failed,
}

/// Counters an engine reports once all its threads are joined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub blocks_read: u64,
    pub blocks_written: u64,
    /// Threads that actually did work, the calling thread included.
    pub workers: usize,
}

/// Outcome of a successful run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub strategy: Strategy,
    pub layout: Layout,
    pub tally: Tally,
    pub output: PathBuf,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Input bytes hashed per second, truncated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn throughput(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { (self.layout.input_len() as f64 / secs) as u64 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::new("disk.img");
        assert_eq!(settings.output, PathBuf::from("disk.img.signature"));
        assert_eq!(settings.strategy, Strategy::Stream);
        assert!(settings.threads >= 1);
        settings.validate().unwrap();
    }

    #[test]
    fn test_block_size_below_minimum() {
        let settings = Settings { block_size: MIN_BLOCK_SIZE - 1, ..Settings::new("disk.img") };
        assert!(matches!(settings.validate(), Err(SignError::InvalidArgument(_))));
    }

    #[test]
    fn test_minimum_block_size_accepted() {
        let settings = Settings { block_size: MIN_BLOCK_SIZE, ..Settings::new("disk.img") };
        settings.validate().unwrap();
    }

    #[test]
    fn test_queue_capacity_below_minimum() {
        let settings = Settings { queue_capacity: 1, ..Settings::new("disk.img") };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("blocks count (-c)"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let settings = Settings { threads: 0, strategy: Strategy::Mapped, ..Settings::new("disk.img") };
        assert!(matches!(settings.validate(), Err(SignError::InvalidArgument(_))));
    }

    #[test]
    fn test_output_same_as_input_rejected() {
        let settings = Settings { output: PathBuf::from("disk.img"), ..Settings::new("disk.img") };
        assert!(matches!(settings.validate(), Err(SignError::InvalidArgument(_))));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Stream.to_string(), "stream");
        assert_eq!(Strategy::Mapped.to_string(), "mapped");
        assert_eq!(RunState::StoresOpened.to_string(), "StoresOpened");
    }
}
