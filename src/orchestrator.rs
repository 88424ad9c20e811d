//! Runs one signing job from settings to a verified signature file.
//!
//! The orchestrator sizes the job, opens the stores the chosen strategy needs
//! (input before output, so a bad input never leaves an output behind), drives
//! the engine, and refuses to report success unless every block read produced
//! exactly one digest.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::block::Layout;
use crate::digest::BlockHasher;
use crate::engine::{mapped, stream};
use crate::error::{Result, SignError};
use crate::file::File;
use crate::mapping::{InputRegion, OutputRegion};
use crate::queue::BoundedBlockQueue;
use crate::types::{RunState, RunSummary, Settings, Strategy, Tally};
use crate::ui::progress::Progress;

pub struct Orchestrator {
    settings: Settings,
    hasher: BlockHasher,
}

impl Orchestrator {
    /// Validates `settings`; nothing is opened yet.
    ///
    /// # Errors
    ///
    /// [`SignError::InvalidArgument`] if a setting is below its minimum.
    /// An output reaching the input through a link is only caught by
    /// [`Orchestrator::run`].
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_hasher(settings, BlockHasher::default())
    }

    pub fn with_hasher(settings: Settings, hasher: BlockHasher) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, hasher })
    }

    /// Signs the input into the output file.
    ///
    /// # Errors
    ///
    /// Any [`SignError`] except a recovered worker spawn failure ends the run.
    pub fn run(&self) -> Result<RunSummary> {
        self.execute().inspect_err(|err| debug!(state = %RunState::Failed, error = %err, "run state"))
    }

    fn execute(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let settings = &self.settings;
        enter(RunState::Init);

        if settings.verify {
            warn!("signature verification (-y) is not implemented; signing only");
        }

        let input = File::new(&settings.input);
        let layout = Layout::new(input.size()?, settings.block_size)?;
        if input.is_same_file(&settings.output)? {
            return Err(SignError::InvalidArgument(format!("output file {} is the input file", settings.output.display())));
        }
        enter(RunState::SizingComputed);
        debug!(input_len = layout.input_len(), block_size = layout.block_size(), blocks = layout.block_count(), last_block_len = layout.last_block_len(), "sizing computed");
        info!(strategy = %settings.strategy, input = %settings.input.display(), output = %settings.output.display(), "signing");

        let progress = if settings.verbose { Progress::new(layout.input_len(), "Signing...") } else { Progress::hidden() };

        let tally = match settings.strategy {
            Strategy::Stream => self.run_stream(&input, &progress)?,
            Strategy::Mapped => self.run_mapped(&layout, &progress)?,
        };
        enter(RunState::AllJoined);
        progress.finish();

        verify(&tally)?;
        enter(RunState::Verified);

        let summary = RunSummary { strategy: settings.strategy, layout, tally, output: settings.output.clone(), elapsed: started.elapsed() };
        enter(RunState::Done);
        info!(blocks = tally.blocks_written, workers = tally.workers, elapsed_ms = summary.elapsed.as_millis(), "signature written");

        Ok(summary)
    }

    fn run_stream(&self, input: &File, progress: &Progress) -> Result<Tally> {
        let settings = &self.settings;
        let reader = input.reader()?;
        let mut queue = BoundedBlockQueue::new(settings.block_size, settings.queue_capacity)?;
        let writer = File::new(&settings.output).writer()?;
        enter(RunState::StoresOpened);

        enter(RunState::WorkersRunning);
        stream::run(reader, writer, &mut queue, &self.hasher, progress)
    }

    fn run_mapped(&self, layout: &Layout, progress: &Progress) -> Result<Tally> {
        let settings = &self.settings;
        let input = InputRegion::open(&settings.input)?;
        let mut output = OutputRegion::create(&settings.output, layout.block_count())?;
        enter(RunState::StoresOpened);

        enter(RunState::WorkersRunning);
        mapped::run(&input, &mut output, layout, settings.threads, &self.hasher, progress)
    }
}

fn enter(state: RunState) {
    debug!(%state, "run state");
}

fn verify(tally: &Tally) -> Result<()> {
    if tally.blocks_read == tally.blocks_written {
        Ok(())
    } else {
        Err(SignError::Consistency { read: tally.blocks_read, written: tally.blocks_written })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::tempdir;

    use super::*;
    use crate::digest::DIGEST_SIZE;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + i / 13) as u8).collect()
    }

    fn settings(input: &Path, output: PathBuf, block_size: usize, strategy: Strategy) -> Settings {
        Settings { output, block_size, strategy, threads: 4, queue_capacity: 4, ..Settings::new(input) }
    }

    fn sign(input: &Path, output: PathBuf, block_size: usize, strategy: Strategy) -> Vec<u8> {
        let summary = Orchestrator::new(settings(input, output, block_size, strategy)).unwrap().run().unwrap();
        fs::read(summary.output).unwrap()
    }

    #[test]
    fn test_output_length_law() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");

        for (len, block_size) in [(0, 64), (1, 64), (64, 64), (65, 64), (10_000, 100), (10_001, 4096)] {
            fs::write(&input, pattern(len)).unwrap();
            for strategy in [Strategy::Stream, Strategy::Mapped] {
                let signature = sign(&input, dir.path().join(format!("{len}-{strategy}")), block_size, strategy);
                assert_eq!(signature.len(), len.div_ceil(block_size) * DIGEST_SIZE, "len {len} block {block_size} {strategy}");
            }
        }
    }

    #[test]
    fn test_three_full_blocks() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        let data = pattern(3 * 128);
        fs::write(&input, &data).unwrap();

        let signature = sign(&input, dir.path().join("out"), 128, Strategy::Stream);
        let hasher = BlockHasher::default();

        assert_eq!(signature.len(), 3 * DIGEST_SIZE);
        for (i, digest) in signature.chunks(DIGEST_SIZE).enumerate() {
            assert_eq!(digest, hasher.digest(&data[i * 128..(i + 1) * 128]).as_bytes());
        }
    }

    #[test]
    fn test_trailing_hundred_bytes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        let data = pattern(3 * 1024 + 100);
        fs::write(&input, &data).unwrap();

        let last = BlockHasher::default().digest(&data[3 * 1024..]);
        for strategy in [Strategy::Stream, Strategy::Mapped] {
            let signature = sign(&input, dir.path().join(strategy.to_string()), 1024, strategy);
            assert_eq!(signature.len(), 4 * DIGEST_SIZE);
            assert_eq!(&signature[3 * DIGEST_SIZE..], last.as_bytes());
        }
    }

    #[test]
    fn test_strategies_agree() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        fs::write(&input, pattern(123_457)).unwrap();

        let streamed = sign(&input, dir.path().join("stream"), 512, Strategy::Stream);
        let mapped = sign(&input, dir.path().join("mapped"), 512, Strategy::Mapped);
        assert_eq!(streamed, mapped);
    }

    #[test]
    fn test_one_and_many_workers_agree() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        fs::write(&input, pattern(50_000)).unwrap();

        let run = |threads, name: &str| {
            let settings = Settings { threads, ..settings(&input, dir.path().join(name), 64, Strategy::Mapped) };
            let summary = Orchestrator::new(settings).unwrap().run().unwrap();
            fs::read(summary.output).unwrap()
        };

        assert_eq!(run(1, "one"), run(8, "eight"));
    }

    #[test]
    fn test_idempotent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        fs::write(&input, pattern(9_999)).unwrap();

        let first = sign(&input, dir.path().join("first"), 256, Strategy::Stream);
        let second = sign(&input, dir.path().join("second"), 256, Strategy::Stream);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_input_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing");

        for strategy in [Strategy::Stream, Strategy::Mapped] {
            let output = dir.path().join(format!("out-{strategy}"));
            let result = Orchestrator::new(settings(&input, output.clone(), 64, strategy)).unwrap().run();
            assert!(matches!(result, Err(SignError::FileOpen { .. })));
            assert!(!output.exists());
        }
    }

    #[test]
    fn test_capacity_below_minimum_rejected_before_io() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing");
        let output = dir.path().join("out");

        let settings = Settings { queue_capacity: 1, ..settings(&input, output.clone(), 64, Strategy::Stream) };
        assert!(matches!(Orchestrator::new(settings), Err(SignError::InvalidArgument(_))));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_output_linked_to_input_is_rejected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        let data = vec![7u8; 4096];
        fs::write(&input, &data).unwrap();
        std::os::unix::fs::symlink(&input, dir.path().join("soft")).unwrap();
        fs::hard_link(&input, dir.path().join("hard")).unwrap();

        for strategy in [Strategy::Stream, Strategy::Mapped] {
            for link in ["soft", "hard"] {
                let orchestrator = Orchestrator::new(settings(&input, dir.path().join(link), 1024, strategy)).unwrap();
                assert!(matches!(orchestrator.run(), Err(SignError::InvalidArgument(_))));
                assert_eq!(fs::read(&input).unwrap(), data);
            }
        }
    }

    #[test]
    fn test_output_reaching_input_through_parent_is_rejected() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let input = dir.path().join("input");
        fs::write(&input, pattern(500)).unwrap();

        let output = dir.path().join("sub").join("..").join("input");
        let result = Orchestrator::new(settings(&input, output, 100, Strategy::Mapped)).unwrap().run();
        assert!(matches!(result, Err(SignError::InvalidArgument(_))));
        assert_eq!(fs::read(&input).unwrap(), pattern(500));
    }

    #[test]
    fn test_summary_counts() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        fs::write(&input, pattern(1000)).unwrap();

        let summary = Orchestrator::new(settings(&input, dir.path().join("out"), 100, Strategy::Mapped)).unwrap().run().unwrap();
        assert_eq!(summary.layout.block_count(), 10);
        assert_eq!(summary.tally.blocks_read, 10);
        assert_eq!(summary.tally.blocks_written, 10);
        assert!(summary.tally.workers >= 1);
    }

    #[test]
    fn test_verify_flag_is_accepted() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input");
        fs::write(&input, pattern(300)).unwrap();

        let settings = Settings { verify: true, ..settings(&input, dir.path().join("out"), 100, Strategy::Stream) };
        let summary = Orchestrator::new(settings).unwrap().run().unwrap();
        assert_eq!(summary.tally.blocks_written, 3);
    }

    #[test]
    fn test_mismatch_is_consistency_error() {
        let tally = Tally { blocks_read: 4, blocks_written: 3, workers: 2 };
        assert!(matches!(verify(&tally), Err(SignError::Consistency { read: 4, written: 3 })));
    }
}
