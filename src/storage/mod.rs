//! Storage layer for topic-progress.
//!
//! Persists per-topic read progress in `SQLite` and keeps the on-disk schema
//! current through an ordered, transactional migration table.

pub mod config;
pub mod migrate;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use config::StoreConfig;
pub use schema::{CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION, MIGRATIONS, Migration};
pub use sqlite::SqliteReadProgressStore;
pub use traits::{ReadProgressStore, StoreStats};

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".topic-progress/progress.db";
