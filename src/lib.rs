//! # topic-progress
//!
//! Durable per-topic read progress for forum clients.
//!
//! The store remembers, for each topic, the highest reply index the local
//! user has read and when. It is backed by `SQLite` and upgrades older
//! on-disk layouts in place through an ordered table of transactional
//! migrations.
//!
//! ```
//! use topic_progress::{ReadProgressStore, SqliteReadProgressStore};
//!
//! let store = SqliteReadProgressStore::in_memory()?;
//! assert_eq!(store.last_read_reply(1)?, None);
//!
//! store.set_last_read_reply(1, 25)?;
//! assert_eq!(store.last_read_reply(1)?, Some(25));
//! # Ok::<(), topic_progress::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod core;
pub mod error;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

pub use crate::core::{NO_RECORD, ReadProgress, TopicId};

pub use storage::{
    CURRENT_SCHEMA_VERSION, DEFAULT_DB_PATH, ReadProgressStore, SqliteReadProgressStore,
    StoreConfig, StoreStats,
};

pub use cli::{Cli, Commands, OutputFormat};
