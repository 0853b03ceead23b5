//! Database schema definitions.
//!
//! Contains table names, DDL, and the ordered migration table for the
//! read-progress `SQLite` database.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Version assigned to databases that predate version tracking.
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

/// Canonical table name.
pub const TABLE_NAME: &str = "topic";

/// SQL schema for a fresh install (version 1).
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE topic (
    topic_id INTEGER PRIMARY KEY,
    last_read_reply INTEGER NOT NULL,
    last_read_time INTEGER NOT NULL
);
";

/// Version 0 layout, as written by clients before reply tracking existed.
pub const LEGACY_SCHEMA_SQL: &str = r"
CREATE TABLE topic (
    topic_id INTEGER PRIMARY KEY,
    last_read INTEGER NOT NULL
);
";

/// SQL to create the version tracking table inside a migration.
pub const CREATE_SCHEMA_INFO_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// SQL to check whether a table exists. Bind the table name.
pub const TABLE_EXISTS_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name = ?;
";

/// SQL listing a table's column names. Bind the table name.
pub const TABLE_COLUMNS_SQL: &str = r"
SELECT name FROM pragma_table_info(?);
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// SQL to read progress for one topic.
pub const GET_REPLY_SQL: &str = r"
SELECT last_read_reply FROM topic WHERE topic_id = ?;
";

/// SQL to read a full record for one topic.
pub const GET_PROGRESS_SQL: &str = r"
SELECT topic_id, last_read_reply, last_read_time FROM topic WHERE topic_id = ?;
";

/// Upsert keyed by `topic_id`. The stored time never moves backwards even if
/// the wall clock does. Binds: topic id, reply, now.
pub const UPSERT_PROGRESS_SQL: &str = r"
INSERT OR REPLACE INTO topic (topic_id, last_read_reply, last_read_time)
VALUES (
    ?1,
    ?2,
    MAX(?3, COALESCE((SELECT last_read_time FROM topic WHERE topic_id = ?1), 0))
);
";

/// One named statement of a migration.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    /// Short label used in logs and error messages.
    pub name: &'static str,
    /// SQL to execute.
    pub sql: &'static str,
}

/// Migrations from older schema versions.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version this migration upgrades from.
    pub from_version: u32,
    /// Version this migration upgrades to.
    pub to_version: u32,
    /// Statements executed in order inside one transaction.
    pub steps: &'static [MigrationStep],
}

/// v0 -> v1: replace the read/unread flag with reply index and timestamp.
///
/// Migrated rows get reply `0` and time `0` regardless of the old flag; a
/// topic marked read in v0 is indistinguishable from one that was not. The
/// copy still reads `last_read` so it fails on any table without the flag.
const MIGRATION_V0_TO_V1: &[MigrationStep] = &[
    MigrationStep {
        name: "create topic_new",
        sql: r"
CREATE TABLE topic_new (
    topic_id INTEGER PRIMARY KEY,
    last_read_reply INTEGER NOT NULL,
    last_read_time INTEGER NOT NULL
);",
    },
    MigrationStep {
        name: "copy rows",
        sql: r"
INSERT INTO topic_new (topic_id, last_read_reply, last_read_time)
SELECT topic_id, CASE WHEN last_read THEN 0 ELSE 0 END, 0 FROM topic;",
    },
    MigrationStep {
        name: "drop topic",
        sql: "DROP TABLE topic;",
    },
    MigrationStep {
        name: "rename topic_new",
        sql: "ALTER TABLE topic_new RENAME TO topic;",
    },
];

/// Available migrations, ordered by `from_version`.
pub const MIGRATIONS: &[Migration] = &[Migration {
    from_version: 0,
    to_version: 1,
    steps: MIGRATION_V0_TO_V1,
}];

/// Gets the migrations needed to go from `current_version` to `target_version`
/// out of `migrations`, in order.
#[must_use]
pub fn migrations_between(
    migrations: &'static [Migration],
    current_version: u32,
    target_version: u32,
) -> Vec<&'static Migration> {
    migrations
        .iter()
        .filter(|m| m.from_version >= current_version && m.to_version <= target_version)
        .collect()
}
