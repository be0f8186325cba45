//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the todonote core.
//! - Apply schema migrations in deterministic order.
//! - Hand out the shared connection handle used by the SQL-backed stores.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - One connection is shared by all callers; statements serialize on it.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_retry, CONNECT_ATTEMPTS, CONNECT_BACKOFF};

pub type DbResult<T> = Result<T, DbError>;

/// Connection handle shared by every SQL-backed repository.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Wraps a migrated connection for sharing across repositories and threads.
pub fn share(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

/// Returns whether `table` exists in the connected schema.
pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("could not connect to database after {attempts} attempts: {source}")]
    ConnectFailed {
        attempts: u32,
        #[source]
        source: Box<DbError>,
    },
    #[error("database connect cancelled")]
    Cancelled,
}
