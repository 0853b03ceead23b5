//! Error types for topic-progress operations.
//!
//! Errors are split by who has to act on them: `StorageError` covers the
//! database (fatal during schema setup, surfaced to the caller during normal
//! reads and writes), while `Error::InvalidReplyIndex` marks a caller bug that
//! is rejected before storage is touched.

use thiserror::Error;

/// Result type alias for topic-progress operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A reply index that is not strictly positive was passed to a write.
    #[error("reply index must be positive, got {reply}")]
    InvalidReplyIndex {
        /// The rejected reply index.
        reply: i64,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Returns true if this error came from the storage engine.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Store has not been created yet.
    #[error("progress store not initialized. Run: topic-progress init")]
    NotInitialized,

    /// A schema migration failed and was rolled back.
    #[error("migration v{from} -> v{to} failed: {reason}")]
    Migration {
        /// Version the migration started from.
        from: u32,
        /// Version the migration was upgrading to.
        to: u32,
        /// Underlying failure.
        reason: String,
    },

    /// Fresh schema creation failed and was rolled back.
    #[error("schema creation failed: {0}")]
    SchemaCreation(String),

    /// Database was written by a newer schema than this build understands.
    #[error("unsupported schema version {found} (newest supported: {supported})")]
    UnsupportedVersion {
        /// Version found on disk.
        found: u32,
        /// Newest version this build can handle.
        supported: u32,
    },

    /// No migration path exists between two versions.
    #[error("no migration path from v{from} to v{to}")]
    NoMigrationPath {
        /// Starting version.
        from: u32,
        /// Requested version.
        to: u32,
    },

    /// The store exists at an older version and must be upgraded first.
    #[error("progress store is at schema v{found}, needs v{current}. Run: topic-progress init")]
    UpgradeRequired {
        /// Version found on disk.
        found: u32,
        /// Version this build writes.
        current: u32,
    },

    /// A `topic` table of unknown layout and no recorded version.
    #[error("unrecognized topic table layout (columns: {columns})")]
    UnrecognizedLayout {
        /// Comma-separated column names found.
        columns: String,
    },

    /// The shared connection lock was poisoned by a panicking holder.
    #[error("connection lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidReplyIndex { reply: -5 };
        assert_eq!(err.to_string(), "reply index must be positive, got -5");

        let err = Error::Config {
            message: "bad path".to_string(),
        };
        assert_eq!(err.to_string(), "configuration error: bad path");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::NotInitialized;
        assert_eq!(
            err.to_string(),
            "progress store not initialized. Run: topic-progress init"
        );

        let err = StorageError::Migration {
            from: 0,
            to: 1,
            reason: "no such column".to_string(),
        };
        assert_eq!(err.to_string(), "migration v0 -> v1 failed: no such column");

        let err = StorageError::UnsupportedVersion {
            found: 7,
            supported: 1,
        };
        assert!(err.to_string().contains("unsupported schema version 7"));

        let err = StorageError::NoMigrationPath { from: 3, to: 4 };
        assert_eq!(err.to_string(), "no migration path from v3 to v4");

        let err = StorageError::UpgradeRequired {
            found: 0,
            current: 1,
        };
        assert!(err.to_string().contains("Run: topic-progress init"));
    }

    #[test]
    fn test_error_from_storage() {
        let err: Error = StorageError::LockPoisoned.into();
        assert!(err.is_storage());
        assert!(matches!(err, Error::Storage(StorageError::LockPoisoned)));
    }

    #[test]
    fn test_contract_violation_is_not_storage() {
        let err = Error::InvalidReplyIndex { reply: 0 };
        assert!(!err.is_storage());
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let err: Error = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn test_from_rusqlite_error_to_storage_error() {
        let err: StorageError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StorageError::Database(_)));
    }
}
