//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//! - Retry file connection establishment with a fixed backoff.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.
//! - Connect retries stop early once the cancel token fires.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::cancel::CancelToken;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Number of connection attempts made by [`open_db_with_retry`].
pub const CONNECT_ATTEMPTS: u32 = 2;
/// Pause between connection attempts.
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

const BACKOFF_POLL: Duration = Duration::from_millis(50);

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Opens a database file, retrying once after [`CONNECT_BACKOFF`].
///
/// # Errors
/// - `DbError::Cancelled` when `cancel` fires before a connection is made.
/// - `DbError::ConnectFailed` wrapping the last failure after
///   [`CONNECT_ATTEMPTS`] attempts.
pub fn open_db_with_retry(path: impl AsRef<Path>, cancel: &CancelToken) -> DbResult<Connection> {
    let path = path.as_ref();
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        attempt += 1;

        match open_db(path) {
            Ok(conn) => return Ok(conn),
            Err(err) if attempt >= CONNECT_ATTEMPTS => {
                return Err(DbError::ConnectFailed {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                warn!(
                    "event=db_connect_retry module=db status=retry attempt={} backoff_ms={} error={}",
                    attempt,
                    CONNECT_BACKOFF.as_millis(),
                    err
                );
                wait_backoff(cancel)?;
            }
        }
    }
}

fn wait_backoff(cancel: &CancelToken) -> DbResult<()> {
    let deadline = Instant::now() + CONNECT_BACKOFF;
    while Instant::now() < deadline {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        thread::sleep(BACKOFF_POLL);
    }
    Ok(())
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}
