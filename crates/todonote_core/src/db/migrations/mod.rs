//! Schema steps for the users/notes database.
//!
//! # Responsibility
//! - List every schema step this binary knows, oldest first.
//! - Bring a connection from its recorded schema version up to the newest.
//!
//! # Invariants
//! - Step versions start at 1 and grow by exactly one.
//! - Each step commits together with its `PRAGMA user_version` bump, so a
//!   failed step leaves the database at the previous version.
//! - A database newer than this binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "users_and_notes",
    sql: include_str!("0001_init.sql"),
}];

/// Schema version produced by running every known step.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Runs the steps newer than the connection's recorded version.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer binary.
/// - `Sqlite` when a step fails; earlier steps stay committed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let recorded: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();
    if recorded > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: recorded,
            latest_supported: latest,
        });
    }

    for step in steps_after(recorded) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok version={} step={}",
            step.version, step.name
        );
    }

    Ok(())
}

fn steps_after(version: u32) -> impl Iterator<Item = &'static SchemaStep> {
    SCHEMA_STEPS.iter().filter(move |step| step.version > version)
}
