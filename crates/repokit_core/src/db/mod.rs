//! SQLite session bootstrap, change tracking and statement plumbing.
//!
//! # Responsibility
//! - Open and configure SQLite connections wrapped in a [`Session`].
//! - Track pending insert/update/delete changes until a single flush.
//! - Run store calls either inline or on the tokio blocking pool.
//!
//! # Invariants
//! - A session's connection is closed at most once.
//! - A flush applies every pending change in one transaction or none of them.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) mod changes;
mod open;
mod params;
pub(crate) mod session;

pub use changes::ChangeKind;
pub use open::{open_session, open_session_in_memory};
pub use params::SqlParams;
pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    SessionClosed,
    SessionPoisoned,
    Scheduler(String),
    StaleChange {
        kind: ChangeKind,
        table: &'static str,
        key: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SessionClosed => write!(f, "session is closed"),
            Self::SessionPoisoned => {
                write!(f, "session is unusable after a panic in a previous store call")
            }
            Self::Scheduler(message) => write!(f, "store call could not be scheduled: {message}"),
            Self::StaleChange { kind, table, key } => write!(
                f,
                "{kind} on `{table}` with key {key} was expected to affect 1 row but affected 0"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SessionClosed
            | Self::SessionPoisoned
            | Self::Scheduler(_)
            | Self::StaleChange { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Connection settings applied when a session is opened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Enables `PRAGMA foreign_keys`.
    pub foreign_keys: bool,
    /// Batch executed once after the connection is configured.
    pub init_sql: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            foreign_keys: true,
            init_sql: None,
        }
    }
}

/// Quotes an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
