//! SQLite reads behind the generic repository.

use crate::db::{quote_identifier, DbResult, SqlParams};
use crate::model::entity::Entity;
use crate::query::{Predicate, Window};
use rusqlite::{params, Connection, Rows};

pub(super) fn select_sql<T: Entity>() -> String {
    let columns = std::iter::once(T::KEY)
        .chain(T::COLUMNS.iter().copied())
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {}", quote_identifier(T::TABLE))
}

/// First row in natural order accepted by `filter`; stops reading there.
pub(super) fn find_first<T: Entity>(
    conn: &Connection,
    filter: &Predicate<T>,
) -> DbResult<Option<T>> {
    let mut stmt = conn.prepare(&select_sql::<T>())?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let item = T::from_row(row)?;
        if filter.matches(&item) {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

pub(super) fn load_all<T: Entity>(conn: &Connection) -> DbResult<Vec<T>> {
    let mut stmt = conn.prepare(&select_sql::<T>())?;
    let rows = stmt.query([])?;
    collect_rows(rows)
}

pub(super) fn load_matching<T: Entity>(
    conn: &Connection,
    filter: &Predicate<T>,
) -> DbResult<Vec<T>> {
    let mut stmt = conn.prepare(&select_sql::<T>())?;
    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let item = T::from_row(row)?;
        if filter.matches(&item) {
            items.push(item);
        }
    }
    Ok(items)
}

/// Natural-order window read with `LIMIT`/`OFFSET`.
pub(super) fn load_window<T: Entity>(conn: &Connection, window: Window) -> DbResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!("{} LIMIT ?1 OFFSET ?2", select_sql::<T>()))?;
    let rows = stmt.query(params![
        i64::try_from(window.take).unwrap_or(i64::MAX),
        i64::try_from(window.skip).unwrap_or(i64::MAX),
    ])?;
    collect_rows(rows)
}

pub(super) fn execute_raw(conn: &Connection, command: &str, params: &SqlParams) -> DbResult<usize> {
    let mut stmt = conn.prepare(command)?;
    Ok(params.execute(&mut stmt)?)
}

pub(super) fn query_raw<T: Entity>(
    conn: &Connection,
    command: &str,
    params: &SqlParams,
) -> DbResult<Vec<T>> {
    let mut stmt = conn.prepare(command)?;
    let rows = params.query(&mut stmt)?;
    collect_rows(rows)
}

fn collect_rows<T: Entity>(mut rows: Rows<'_>) -> DbResult<Vec<T>> {
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(T::from_row(row)?);
    }
    Ok(items)
}
