//! Typed repositories over SQLite composed with a unit of work.
//!
//! A [`UnitOfWork`] owns one [`Session`], hands out one cached
//! [`Repository`] per entity type and commits every pending change they
//! registered with a single [`UnitOfWork::save`]. Operations report their
//! outcome through [`StatusResult`] / [`DataResult`] instead of `Err`.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod unit_of_work;

pub use db::{
    open_session, open_session_in_memory, ChangeKind, DbError, DbResult, Session, SessionOptions,
    SqlParams,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::entity::Entity;
pub use model::status::{DataResult, StatusResult};
pub use query::{OrderBy, Predicate, Query, Window};
pub use repo::generic_repo::Repository;
pub use repo::{RepoError, RepoResult};
pub use unit_of_work::UnitOfWork;

/// Re-exported so entity implementations can name row and value types.
pub use rusqlite::{types::Value, Row};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
