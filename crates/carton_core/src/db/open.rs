//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections with required pragmas.
//! - Emit `db_open` logging events with duration and status.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout set.
//! - Schema migrations stay with the host (see `db::migrations`); opening a
//!   connection never touches entity tables.

use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and configures it for repository use.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path.as_ref()))
}

/// Opens an in-memory SQLite database configured for repository use.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = open()
        .map_err(Into::into)
        .and_then(|conn| configure(conn).map_err(Into::into));

    match result {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn configure(conn: Connection) -> rusqlite::Result<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}
