//! Terminal output for finished runs.

use bytesize::ByteSize;
use comfy_table::Table;
use console::style;

use crate::types::{RunSummary, Strategy};

/// Builds the verbose summary table of a finished run.
pub fn summary_table(summary: &RunSummary) -> Table {
    let layout = &summary.layout;
    let tally = &summary.tally;

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Strategy".to_owned(), summary.strategy.to_string()]);
    table.add_row(vec!["Block size".to_owned(), ByteSize(layout.block_size() as u64).to_string()]);
    table.add_row(vec!["Input".to_owned(), ByteSize(layout.input_len()).to_string()]);
    table.add_row(vec!["Signature".to_owned(), ByteSize(layout.output_len().unwrap_or_default()).to_string()]);
    table.add_row(vec!["Blocks read".to_owned(), tally.blocks_read.to_string()]);
    table.add_row(vec!["Blocks written".to_owned(), tally.blocks_written.to_string()]);
    if summary.strategy == Strategy::Mapped {
        table.add_row(vec!["Workers".to_owned(), tally.workers.to_string()]);
    }
    table.add_row(vec!["Elapsed".to_owned(), format!("{} ms", summary.elapsed.as_millis())]);
    table.add_row(vec!["Throughput".to_owned(), format!("{}/s", ByteSize(summary.throughput()))]);

    table
}

pub fn show_summary(summary: &RunSummary) {
    println!();
    println!("{}", summary_table(summary));
}

pub fn show_success(summary: &RunSummary) {
    println!("{} {}", style("✓").green(), style(format!("Signature written: {}", summary.output.display())).bold());
}
