//! Generic repository over one entity type.
//!
//! # Responsibility
//! - Expose CRUD and query operations for any [`Entity`](crate::Entity).
//! - Convert argument and store faults into result envelopes.
//!
//! # Invariants
//! - Public operations never return `Err` or panic on bad input; they return
//!   a failed [`StatusResult`](crate::StatusResult) with defaulted data.
//! - A lookup that matches nothing is a success.
//! - Reads see committed rows only; writes stay pending until the owning
//!   unit of work saves.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod generic_repo;
mod sql;

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure classes of repository operations before they are enveloped.
#[derive(Debug)]
pub enum RepoError {
    InvalidArgument(String),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
