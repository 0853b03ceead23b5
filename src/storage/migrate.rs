//! Schema version detection and transactional migration.
//!
//! Every schema change runs inside one `IMMEDIATE` transaction that also
//! records the new version, so a failure at any step leaves the database
//! exactly as it was and a concurrent opener never sees a half-migrated table.

use crate::error::{Result, StorageError};
use crate::storage::schema::{
    CREATE_SCHEMA_INFO_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, LEGACY_SCHEMA_VERSION,
    Migration, SCHEMA_SQL, SET_VERSION_SQL, TABLE_COLUMNS_SQL, TABLE_EXISTS_SQL, TABLE_NAME,
    migrations_between,
};
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use std::path::Path;
use tracing::{debug, info, warn};

/// Returns true if a table named `name` exists.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(TABLE_EXISTS_SQL, params![name], |row| row.get(0))
        .map_err(StorageError::from)?;
    Ok(count > 0)
}

/// Detects the schema version of an open database.
///
/// Returns `None` for an empty database and the recorded version when
/// `schema_info` has one. A progress table with no version record is
/// classified by its columns: the read flag marks [`LEGACY_SCHEMA_VERSION`],
/// reply and time columns mark [`CURRENT_SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`StorageError::UnrecognizedLayout`] for an unversioned table of
/// any other shape.
pub fn detect_version(conn: &Connection) -> Result<Option<u32>> {
    if let Some(version) = recorded_version(conn)? {
        return Ok(Some(version));
    }

    if table_exists(conn, TABLE_NAME)? {
        return layout_version(conn).map(Some);
    }

    Ok(None)
}

/// Reads the schema version of the file at `path` without modifying it.
///
/// The file must already exist.
pub fn peek_version(path: &Path) -> Result<Option<u32>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .map_err(StorageError::from)?;
    detect_version(&conn)
}

fn recorded_version(conn: &Connection) -> Result<Option<u32>> {
    if !table_exists(conn, "schema_info")? {
        return Ok(None);
    }
    let version: Option<String> = conn
        .query_row(GET_VERSION_SQL, [], |row| row.get(0))
        .optional()
        .map_err(StorageError::from)?;
    let Some(v) = version else {
        return Ok(None);
    };
    let parsed = v
        .parse()
        .map_err(|_| StorageError::Database(format!("corrupt schema version: {v}")))?;
    Ok(Some(parsed))
}

fn layout_version(conn: &Connection) -> Result<u32> {
    let mut stmt = conn
        .prepare(TABLE_COLUMNS_SQL)
        .map_err(StorageError::from)?;
    let columns: Vec<String> = stmt
        .query_map(params![TABLE_NAME], |row| row.get(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<_>>())
        .map_err(StorageError::from)?;
    let has = |name: &str| columns.iter().any(|c| c == name);

    if has("last_read") {
        Ok(LEGACY_SCHEMA_VERSION)
    } else if has("last_read_reply") && has("last_read_time") {
        Ok(CURRENT_SCHEMA_VERSION)
    } else {
        Err(StorageError::UnrecognizedLayout {
            columns: columns.join(", "),
        }
        .into())
    }
}

fn set_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_SCHEMA_INFO_SQL)?;
    conn.execute(SET_VERSION_SQL, params![version.to_string()])?;
    Ok(())
}

/// Creates the current schema on an empty database.
///
/// Does nothing if another connection created it first.
pub fn create_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StorageError::SchemaCreation(e.to_string()))?;

    if detect_version(&tx)?.is_some() {
        debug!("schema already present, skipping creation");
        return Ok(());
    }

    tx.execute_batch(SCHEMA_SQL)
        .and_then(|()| set_version(&tx, CURRENT_SCHEMA_VERSION))
        .map_err(|e| StorageError::SchemaCreation(e.to_string()))?;
    tx.commit()
        .map_err(|e| StorageError::SchemaCreation(e.to_string()))?;

    info!(version = CURRENT_SCHEMA_VERSION, "created progress schema");
    Ok(())
}

/// Records `version` for a progress table that already has that layout but
/// no version row. Rows are left untouched.
fn stamp_version(conn: &mut Connection, version: u32) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StorageError::from)?;

    if recorded_version(&tx)?.is_some() {
        debug!("schema version recorded by another connection");
        return Ok(());
    }

    set_version(&tx, version).map_err(StorageError::from)?;
    tx.commit().map_err(StorageError::from)?;

    info!(version, "recorded version of unversioned progress table");
    Ok(())
}

/// Applies one migration atomically.
///
/// Returns `false` without changes when the database is already at or past
/// `migration.to_version`.
pub fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<bool> {
    let (from, to) = (migration.from_version, migration.to_version);
    let failed = |reason: String| StorageError::Migration { from, to, reason };

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| failed(e.to_string()))?;

    let current = detect_version(&tx)?.ok_or(StorageError::NotInitialized)?;
    if current >= to {
        debug!(from, to, current, "migration already applied");
        return Ok(false);
    }
    if current != from {
        return Err(StorageError::NoMigrationPath { from: current, to }.into());
    }

    for step in migration.steps {
        debug!(from, to, step = step.name, "running migration step");
        if let Err(e) = tx.execute_batch(step.sql) {
            warn!(from, to, step = step.name, error = %e, "migration failed, rolling back");
            return Err(failed(format!("{}: {e}", step.name)).into());
        }
    }

    set_version(&tx, to).map_err(|e| failed(e.to_string()))?;
    tx.commit().map_err(|e| failed(e.to_string()))?;

    info!(from, to, "migrated progress schema");
    Ok(true)
}

/// Brings the database up to `target_version`, creating it if empty.
///
/// Returns the version the database is at afterwards.
///
/// # Errors
///
/// Any failure here is an initialization failure: the database is left at
/// the last version that committed and the caller should not proceed.
pub fn ensure_schema(
    conn: &mut Connection,
    migrations: &'static [Migration],
    target_version: u32,
) -> Result<u32> {
    let Some(mut current) = detect_version(conn)? else {
        create_schema(conn)?;
        return Ok(CURRENT_SCHEMA_VERSION);
    };

    if current > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: current,
            supported: CURRENT_SCHEMA_VERSION,
        }
        .into());
    }

    if current > LEGACY_SCHEMA_VERSION && recorded_version(conn)?.is_none() {
        stamp_version(conn, current)?;
    }

    for migration in migrations_between(migrations, current, target_version) {
        apply_migration(conn, migration)?;
        current = migration.to_version;
    }

    if current < target_version {
        return Err(StorageError::NoMigrationPath {
            from: current,
            to: target_version,
        }
        .into());
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{LEGACY_SCHEMA_SQL, MIGRATIONS, MigrationStep};

    fn legacy_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_SCHEMA_SQL).unwrap();
        conn.execute_batch("INSERT INTO topic VALUES (1, 1); INSERT INTO topic VALUES (2, 0);")
            .unwrap();
        conn
    }

    fn rows(conn: &Connection) -> Vec<(i64, i64, i64)> {
        let mut stmt = conn
            .prepare("SELECT topic_id, last_read_reply, last_read_time FROM topic ORDER BY topic_id")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_detect_version_empty() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(detect_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_detect_version_legacy() {
        let conn = legacy_db();
        assert_eq!(detect_version(&conn).unwrap(), Some(LEGACY_SCHEMA_VERSION));
    }

    #[test]
    fn test_detect_version_unversioned_current_layout() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA user_version = 1;
             CREATE TABLE topic (topic_id INTEGER PRIMARY KEY, \
             last_read_reply INTEGER NOT NULL, last_read_time INTEGER NOT NULL);",
        )
        .unwrap();
        assert_eq!(detect_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_detect_version_unknown_layout() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE topic (topic_id INTEGER PRIMARY KEY, title TEXT);")
            .unwrap();
        let err = detect_version(&conn).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::UnrecognizedLayout { .. })
        ));
    }

    #[test]
    fn test_unversioned_current_layout_is_stamped_not_migrated() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE topic (topic_id INTEGER PRIMARY KEY, \
             last_read_reply INTEGER NOT NULL, last_read_time INTEGER NOT NULL);
             INSERT INTO topic VALUES (1, 42, 1700000000000);",
        )
        .unwrap();

        let version = ensure_schema(&mut conn, MIGRATIONS, CURRENT_SCHEMA_VERSION).unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
        assert_eq!(rows(&conn), vec![(1, 42, 1_700_000_000_000)]);
        assert_eq!(recorded_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_copy_step_requires_legacy_flag() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE topic (topic_id INTEGER PRIMARY KEY, last_read_reply INTEGER);
             CREATE TABLE topic_new (topic_id INTEGER PRIMARY KEY, \
             last_read_reply INTEGER NOT NULL, last_read_time INTEGER NOT NULL);
             INSERT INTO topic VALUES (1, 42);",
        )
        .unwrap();
        let copy = MIGRATIONS[0]
            .steps
            .iter()
            .find(|step| step.name == "copy rows")
            .unwrap();
        assert!(conn.execute_batch(copy.sql).is_err());
    }

    #[test]
    fn test_create_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema(&mut conn).unwrap();
        assert_eq!(detect_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        // second call is a no-op
        create_schema(&mut conn).unwrap();
    }

    #[test]
    fn test_failed_create_schema_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        // a view is not a table, so the database still reads as empty
        conn.execute_batch("CREATE VIEW topic AS SELECT 1 AS topic_id;")
            .unwrap();
        assert_eq!(detect_version(&conn).unwrap(), None);

        let err = create_schema(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::SchemaCreation(_))
        ));

        assert_eq!(detect_version(&conn).unwrap(), None);
        assert!(!table_exists(&conn, "schema_info").unwrap());
        assert!(!table_exists(&conn, "topic").unwrap());
    }

    #[test]
    fn test_migrate_v0_rows() {
        let mut conn = legacy_db();
        let version = ensure_schema(&mut conn, MIGRATIONS, CURRENT_SCHEMA_VERSION).unwrap();
        assert_eq!(version, 1);
        assert_eq!(rows(&conn), vec![(1, 0, 0), (2, 0, 0)]);
        assert!(!table_exists(&conn, "topic_new").unwrap());
    }

    #[test]
    fn test_apply_migration_skips_when_applied() {
        let mut conn = legacy_db();
        assert!(apply_migration(&mut conn, &MIGRATIONS[0]).unwrap());
        assert!(!apply_migration(&mut conn, &MIGRATIONS[0]).unwrap());
    }

    static BROKEN_COPY: &[Migration] = &[Migration {
        from_version: 0,
        to_version: 1,
        steps: &[
            MigrationStep {
                name: "create topic_new",
                sql: "CREATE TABLE topic_new (topic_id INTEGER PRIMARY KEY, \
                      last_read_reply INTEGER NOT NULL, last_read_time INTEGER NOT NULL);",
            },
            MigrationStep {
                name: "copy rows",
                sql: "INSERT INTO topic_new SELECT topic_id, missing_column, 0 FROM topic;",
            },
        ],
    }];

    #[test]
    fn test_failed_migration_rolls_back() {
        let mut conn = legacy_db();
        let err = ensure_schema(&mut conn, BROKEN_COPY, CURRENT_SCHEMA_VERSION).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::Migration { from: 0, to: 1, .. })
        ));

        assert_eq!(detect_version(&conn).unwrap(), Some(LEGACY_SCHEMA_VERSION));
        assert!(!table_exists(&conn, "topic_new").unwrap());
        assert!(!table_exists(&conn, "schema_info").unwrap());
        let flags: i64 = conn
            .query_row("SELECT SUM(last_read) FROM topic", [], |r| r.get(0))
            .unwrap();
        assert_eq!(flags, 1);
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_schema(&mut conn).unwrap();
        set_version(&conn, CURRENT_SCHEMA_VERSION + 1).unwrap();
        let err = ensure_schema(&mut conn, MIGRATIONS, CURRENT_SCHEMA_VERSION).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_missing_migration_path() {
        let mut conn = legacy_db();
        let err = ensure_schema(&mut conn, &[], CURRENT_SCHEMA_VERSION).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::NoMigrationPath { from: 0, to: 1 })
        ));
    }
}
