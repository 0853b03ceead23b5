//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// topic-progress: inspect and maintain a topic read-progress store.
#[derive(Parser, Debug)]
#[command(name = "topic-progress")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the progress database file.
    ///
    /// Defaults to `.topic-progress/progress.db` in the current directory.
    #[arg(short, long, env = "TOPIC_PROGRESS_DB")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database, or migrate an existing one to the current schema.
    Init,

    /// Show store status.
    Status,

    /// Print the last read reply of a topic.
    Get {
        /// Topic ID.
        topic: i64,
    },

    /// Record the last read reply of a topic.
    Set {
        /// Topic ID.
        topic: i64,

        /// 1-based reply index.
        #[arg(allow_negative_numbers = true)]
        reply: i64,
    },

    /// List topics, most recently read first.
    #[command(alias = "ls")]
    List {
        /// Maximum number of topics to show.
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
