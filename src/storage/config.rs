//! Store configuration.
//!
//! A [`StoreConfig`] is built once at process start and handed to
//! [`SqliteReadProgressStore::open_with`](crate::storage::SqliteReadProgressStore::open_with).

use crate::error::{Error, Result};
use crate::storage::schema::{CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION, MIGRATIONS, Migration};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default busy timeout for contended writes.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for opening a progress store.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use topic_progress::storage::StoreConfig;
///
/// let config = StoreConfig::new("progress.db").busy_timeout(Duration::from_secs(1));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Schema version the store must be at once opened.
    pub schema_version: u32,
    /// Ordered migrations available to reach `schema_version`.
    pub migrations: &'static [Migration],
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Use write-ahead logging (file databases only).
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            schema_version: CURRENT_SCHEMA_VERSION,
            migrations: MIGRATIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            wal: true,
        }
    }
}

impl StoreConfig {
    /// Configuration for a database file at `path`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Configuration for an in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enables or disables WAL journaling.
    #[must_use]
    pub const fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }

    /// Overrides the migration table and target version.
    #[must_use]
    pub const fn migrations(mut self, migrations: &'static [Migration], schema_version: u32) -> Self {
        self.migrations = migrations;
        self.schema_version = schema_version;
        self
    }

    /// Checks that the configuration can be opened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the target version is the legacy layout,
    /// newer than this build supports, or the path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version == LEGACY_SCHEMA_VERSION {
            return Err(Error::Config {
                message: "cannot open a store at the legacy schema version".to_string(),
            });
        }
        if self.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(Error::Config {
                message: format!(
                    "schema version {} is newer than supported version {CURRENT_SCHEMA_VERSION}",
                    self.schema_version
                ),
            });
        }
        if self.path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(Error::Config {
                message: "database path is empty".to_string(),
            });
        }
        Ok(())
    }
}
