//! Session bootstrap for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply connection pragmas and the optional init batch.
//!
//! # Invariants
//! - Returned sessions have their pragmas and init batch fully applied.
//! - A connection that fails bootstrap is dropped, never handed out.

use super::session::Session;
use super::{DbResult, SessionOptions};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and wraps it in a new session.
///
/// # Side effects
/// - Creates the file when it does not exist.
/// - Emits `session_open` logging events with duration and status.
pub fn open_session(path: impl AsRef<Path>, options: &SessionOptions) -> DbResult<Session> {
    open_with("file", options, || Connection::open(path))
}

/// Opens a private in-memory SQLite database and wraps it in a new session.
///
/// # Side effects
/// - Emits `session_open` logging events with duration and status.
pub fn open_session_in_memory(options: &SessionOptions) -> DbResult<Session> {
    open_with("memory", options, Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    options: &SessionOptions,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Session> {
    let started_at = Instant::now();
    info!("event=session_open module=db status=start mode={mode}");

    let conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=session_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, options) {
        Ok(()) => {
            let session = Session::new(conn);
            info!(
                "event=session_open module=db status=ok mode={} session_id={} duration_ms={}",
                mode,
                session.id(),
                started_at.elapsed().as_millis()
            );
            Ok(session)
        }
        Err(err) => {
            error!(
                "event=session_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn bootstrap_connection(conn: &Connection, options: &SessionOptions) -> rusqlite::Result<()> {
    let foreign_keys = if options.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    if let Some(init_sql) = options.init_sql.as_deref() {
        conn.execute_batch(init_sql)?;
    }
    Ok(())
}
