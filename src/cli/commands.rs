//! CLI command implementations.

use crate::cli::output::{OutputFormat, format_progress, format_progress_list, format_status};
use crate::cli::parser::{Cli, Commands};
use crate::error::{Result, StorageError};
use crate::storage::migrate::peek_version;
use crate::storage::{CURRENT_SCHEMA_VERSION, ReadProgressStore, SqliteReadProgressStore};
use std::path::Path;

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init => cmd_init(&db_path, format),
        Commands::Status => cmd_status(&db_path, format),
        Commands::Get { topic } => cmd_get(&db_path, *topic, format),
        Commands::Set { topic, reply } => cmd_set(&db_path, *topic, *reply, format),
        Commands::List { limit } => cmd_list(&db_path, *limit, format),
    }
}

/// Opens an existing store at the current schema. Only `init` may create or
/// migrate one.
fn open_storage(db_path: &Path) -> Result<SqliteReadProgressStore> {
    if !db_path.exists() {
        return Err(StorageError::NotInitialized.into());
    }
    match peek_version(db_path)? {
        None => return Err(StorageError::NotInitialized.into()),
        Some(found) if found < CURRENT_SCHEMA_VERSION => {
            return Err(StorageError::UpgradeRequired {
                found,
                current: CURRENT_SCHEMA_VERSION,
            }
            .into());
        }
        Some(_) => {}
    }
    SqliteReadProgressStore::open(db_path)
}

fn cmd_init(db_path: &Path, format: OutputFormat) -> Result<String> {
    let existed = db_path.exists();
    let store = SqliteReadProgressStore::open(db_path)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "{} progress store at: {} (schema v{})\n",
            if existed { "Opened" } else { "Initialized" },
            db_path.display(),
            store.schema_version()
        )),
        OutputFormat::Json => {
            let result = serde_json::json!({
                "path": db_path.to_string_lossy(),
                "created": !existed,
                "schema_version": store.schema_version(),
            });
            Ok(serde_json::to_string_pretty(&result).unwrap_or_default())
        }
    }
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let stats = store.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_get(db_path: &Path, topic: i64, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let progress = store.progress(topic)?;
    Ok(format_progress(topic, progress.as_ref(), format))
}

fn cmd_set(db_path: &Path, topic: i64, reply: i64, format: OutputFormat) -> Result<String> {
    // reject before opening so a bad call never touches the database
    crate::core::validate_reply_index(reply)?;

    let store = open_storage(db_path)?;
    store.set_last_read_reply(topic, reply)?;

    match format {
        OutputFormat::Text => Ok(format!("Topic {topic}: read up to reply {reply}\n")),
        OutputFormat::Json => {
            let progress = store.progress(topic)?;
            Ok(format_progress(topic, progress.as_ref(), format))
        }
    }
}

fn cmd_list(db_path: &Path, limit: usize, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let records = store.list_progress(limit)?;
    Ok(format_progress_list(&records, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    fn cli(db_path: &Path, command: Commands) -> Cli {
        Cli {
            db_path: Some(db_path.to_path_buf()),
            verbose: false,
            format: "text".to_string(),
            command,
        }
    }

    #[test]
    fn test_commands_require_init() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("p.db");
        let err = execute(&cli(&db, Commands::Status)).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::NotInitialized)));
        assert!(!db.exists());
    }

    #[test]
    fn test_init_set_get() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("nested").join("p.db");

        let out = execute(&cli(&db, Commands::Init)).unwrap();
        assert!(out.starts_with("Initialized"));

        execute(&cli(&db, Commands::Set { topic: 9, reply: 4 })).unwrap();
        let out = execute(&cli(&db, Commands::Get { topic: 9 })).unwrap();
        assert_eq!(out, "4\n");

        let out = execute(&cli(&db, Commands::Init)).unwrap();
        assert!(out.starts_with("Opened"));
    }

    #[test]
    fn test_legacy_file_needs_init() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("legacy.db");
        {
            let conn = rusqlite::Connection::open(&db).unwrap();
            conn.execute_batch(crate::storage::schema::LEGACY_SCHEMA_SQL)
                .unwrap();
            conn.execute("INSERT INTO topic VALUES (1, 1)", []).unwrap();
        }

        let err = execute(&cli(&db, Commands::Get { topic: 1 })).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::UpgradeRequired { found: 0, current: 1 })
        ));
        assert_eq!(peek_version(&db).unwrap(), Some(0));

        execute(&cli(&db, Commands::Init)).unwrap();
        let out = execute(&cli(&db, Commands::Get { topic: 1 })).unwrap();
        assert_eq!(out, "0\n");
    }

    #[test]
    fn test_set_rejects_zero_without_opening() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("p.db");
        let err = execute(&cli(&db, Commands::Set { topic: 9, reply: 0 })).unwrap_err();
        assert!(matches!(err, Error::InvalidReplyIndex { reply: 0 }));
        assert!(!db.exists());
    }
}
