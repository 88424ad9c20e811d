//! User interface components for terminal output.
//!
//! - [`display`]: success line and verbose summary table
//! - [`progress`]: byte progress bar shared by engine threads

pub mod display;
pub mod progress;
