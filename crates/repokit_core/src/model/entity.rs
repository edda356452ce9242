//! Mapping contract between plain records and SQLite tables.
//!
//! # Responsibility
//! - Describe where a record type lives (table, identity column, columns).
//! - Convert a record to bind values and a result row back to a record.
//!
//! # Invariants
//! - `values()` returns exactly one value per entry of `COLUMNS`, in order.
//! - `from_row` reads columns by name, so raw queries may select them in any
//!   order as long as every mapped column is present.
//! - `key()` is `None` only for records the store has not assigned an
//!   identity to yet.

use rusqlite::types::Value;
use rusqlite::Row;

/// A record type persisted in one table with a single identity column.
///
/// ```ignore
/// impl Entity for Employee {
///     const TABLE: &'static str = "employees";
///     const KEY: &'static str = "id";
///     const COLUMNS: &'static [&'static str] = &["first_name", "last_name"];
///
///     fn key(&self) -> Option<Value> {
///         self.id.map(Value::Integer)
///     }
///
///     fn values(&self) -> Vec<Value> {
///         vec![
///             Value::Text(self.first_name.clone()),
///             Value::Text(self.last_name.clone()),
///         ]
///     }
///
///     fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
///         Ok(Self {
///             id: row.get("id")?,
///             first_name: row.get("first_name")?,
///             last_name: row.get("last_name")?,
///         })
///     }
/// }
/// ```
pub trait Entity: Send + Sized + 'static {
    /// Table name, unquoted.
    const TABLE: &'static str;
    /// Identity column name, unquoted.
    const KEY: &'static str;
    /// Non-identity columns, in the order `values()` yields them.
    const COLUMNS: &'static [&'static str];

    /// Identity value, or `None` when the store should assign one on insert.
    fn key(&self) -> Option<Value>;

    /// Non-identity column values.
    fn values(&self) -> Vec<Value>;

    /// Builds a record from a row containing `KEY` and every `COLUMNS` entry.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}
