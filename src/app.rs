use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use crate::config::{APP_NAME, DEFAULT_BLOCK_SIZE, DEFAULT_QUEUE_CAPACITY};
use crate::file::File;
use crate::orchestrator::Orchestrator;
use crate::types::{Settings, Strategy, default_threads};

#[derive(Parser, Debug)]
#[command(
    name = "vsign",
    version,
    about = "Creates a binary signature of the contents of INPUT_FILE and writes it to OUTPUT_FILE (by default 'INPUT_FILE.signature')."
)]
pub struct App {
    /// File to sign.
    #[arg(value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Signature destination.
    #[arg(value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Block size in bytes.
    #[arg(short = 'b', long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Blocks held in memory by the stream strategy.
    #[arg(short = 'c', long = "blocks-count", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Worker threads for the mapped strategy [default: logical cores].
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Concurrency strategy.
    #[arg(short = 's', long, value_enum, default_value_t = Strategy::Stream)]
    strategy: Strategy,

    /// Verbose output.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Verify that OUTPUT_FILE contains the signature of INPUT_FILE (not implemented).
    #[arg(short = 'y', long)]
    verify: bool,
}

impl App {
    pub fn init() -> Result<Self> {
        let app = Self::parse();

        let level = if app.verbose { Level::DEBUG } else { Level::WARN };
        let subscriber = tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).with_file(true).with_line_number(true).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        Ok(app)
    }

    pub fn settings(&self) -> Settings {
        let input = File::new(&self.input);
        Settings {
            output: self.output.clone().unwrap_or_else(|| input.signature_path()),
            input: self.input.clone(),
            block_size: self.block_size,
            queue_capacity: self.queue_capacity,
            threads: self.threads.unwrap_or_else(default_threads),
            strategy: self.strategy,
            verbose: self.verbose,
            verify: self.verify,
        }
    }

    pub fn execute(self) -> Result<()> {
        let orchestrator = Orchestrator::new(self.settings()).context("invalid settings")?;
        let summary = orchestrator.run().with_context(|| format!("{APP_NAME} failed: {}", self.input.display()))?;

        if self.verbose {
            crate::ui::display::show_summary(&summary);
        }
        crate::ui::display::show_success(&summary);

        Ok(())
    }
}
