//! CLI layer for topic-progress.
//!
//! A small maintenance tool over the progress store: create or migrate a
//! database, inspect it, and record progress by hand.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
