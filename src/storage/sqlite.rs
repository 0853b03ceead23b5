//! `SQLite` storage implementation.
//!
//! One connection per store, guarded by a mutex so the store can be shared
//! between threads. Schema creation and migration run when the store is
//! opened; a store that opened successfully is always at its configured
//! schema version.

use crate::core::{ReadProgress, TopicId, validate_reply_index};
use crate::error::{Result, StorageError};
use crate::storage::config::StoreConfig;
use crate::storage::migrate::ensure_schema;
use crate::storage::schema::{GET_PROGRESS_SQL, GET_REPLY_SQL, UPSERT_PROGRESS_SQL};
use crate::storage::traits::{ReadProgressStore, StoreStats};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Source of "now" in milliseconds since the Unix epoch.
pub type Clock = fn() -> i64;

/// SQLite-based progress store.
///
/// # Examples
///
/// ```no_run
/// use topic_progress::storage::{ReadProgressStore, SqliteReadProgressStore};
///
/// let store = SqliteReadProgressStore::open("progress.db").unwrap();
/// store.set_last_read_reply(1024, 12).unwrap();
/// assert_eq!(store.last_read_reply(1024).unwrap(), Some(12));
/// ```
#[derive(Debug)]
pub struct SqliteReadProgressStore {
    conn: Mutex<Connection>,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
    schema_version: u32,
    clock: Clock,
}

impl SqliteReadProgressStore {
    /// Opens or creates a store at `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, created, or
    /// migrated. Such failures are not recoverable by retrying.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(&StoreConfig::new(path))
    }

    /// Creates an in-memory store.
    ///
    /// Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::open_with(&StoreConfig::in_memory())
    }

    /// Opens a store from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid `config`, or a storage
    /// error if opening, schema creation, or migration fails.
    pub fn open_with(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let mut conn = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StorageError::Database(e.to_string()))?;
                }
                Connection::open(path).map_err(StorageError::from)?
            }
            None => Connection::open_in_memory().map_err(StorageError::from)?,
        };

        conn.busy_timeout(config.busy_timeout)
            .map_err(StorageError::from)?;

        if config.wal && config.path.is_some() {
            // journal_mode returns the resulting mode as a row
            let _: String = conn
                .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
                .map_err(StorageError::from)?;
        }

        let schema_version = ensure_schema(&mut conn, config.migrations, config.schema_version)?;

        info!(
            path = %config.path.as_deref().map_or_else(|| ":memory:".into(), Path::to_string_lossy),
            schema_version,
            "opened progress store"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            path: config.path.clone(),
            schema_version,
            clock: now_millis,
        })
    }

    /// Replaces the clock used to stamp writes.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the schema version the store was opened at.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<ReadProgress> {
        Ok(ReadProgress {
            topic_id: row.get(0)?,
            last_read_reply: row.get(1)?,
            last_read_time: row.get(2)?,
        })
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row(sql, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl ReadProgressStore for SqliteReadProgressStore {
    fn last_read_reply(&self, topic: TopicId) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(GET_REPLY_SQL).map_err(StorageError::from)?;
        let reply = stmt
            .query_row(params![topic], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;
        Ok(reply)
    }

    fn set_last_read_reply(&self, topic: TopicId, reply: i64) -> Result<()> {
        let reply = validate_reply_index(reply)?;
        let now = (self.clock)();

        let conn = self.conn()?;
        conn.prepare_cached(UPSERT_PROGRESS_SQL)
            .and_then(|mut stmt| stmt.execute(params![topic, reply, now]))
            .map_err(StorageError::from)?;

        debug!(topic, reply, "recorded read progress");
        Ok(())
    }

    fn progress(&self, topic: TopicId) -> Result<Option<ReadProgress>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(GET_PROGRESS_SQL)
            .map_err(StorageError::from)?;
        let progress = stmt
            .query_row(params![topic], Self::row_to_progress)
            .optional()
            .map_err(StorageError::from)?;
        Ok(progress)
    }

    fn list_progress(&self, limit: usize) -> Result<Vec<ReadProgress>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                r"
            SELECT topic_id, last_read_reply, last_read_time
            FROM topic ORDER BY last_read_time DESC, topic_id LIMIT ?
        ",
            )
            .map_err(StorageError::from)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], Self::row_to_progress)
            .map_err(StorageError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StorageError::from)?;

        Ok(records)
    }

    fn topic_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM topic")
    }

    fn stats(&self) -> Result<StoreStats> {
        let topic_count = self.topic_count()?;
        let migrated_count = self.count("SELECT COUNT(*) FROM topic WHERE last_read_reply = 0")?;
        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        Ok(StoreStats {
            topic_count,
            migrated_count,
            schema_version: self.schema_version,
            db_size,
        })
    }
}

/// Returns the current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
