//! Pending change tracking and transactional flush.
//!
//! # Invariants
//! - Changes flush in registration order.
//! - A repeated update of a key replaces the previous one and moves to the
//!   end, so it still runs after everything registered before it.
//! - A delete drops a directly preceding update of its key and is skipped
//!   only when the latest pending change for that key is already a delete.
//! - An update or delete that matches no row aborts the whole flush.

use super::{quote_identifier, DbError, DbResult};
use crate::model::entity::Entity;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::fmt::{Display, Formatter};

/// Kind of a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PendingChange {
    kind: ChangeKind,
    table: &'static str,
    key_column: &'static str,
    key: Option<Value>,
    columns: &'static [&'static str],
    values: Vec<Value>,
}

impl PendingChange {
    pub(crate) fn insert<T: Entity>(entity: &T) -> Self {
        Self {
            kind: ChangeKind::Insert,
            table: T::TABLE,
            key_column: T::KEY,
            key: entity.key(),
            columns: T::COLUMNS,
            values: entity.values(),
        }
    }

    pub(crate) fn update<T: Entity>(key: Value, entity: &T) -> Self {
        Self {
            kind: ChangeKind::Update,
            table: T::TABLE,
            key_column: T::KEY,
            key: Some(key),
            columns: T::COLUMNS,
            values: entity.values(),
        }
    }

    pub(crate) fn delete<T: Entity>(key: Value) -> Self {
        Self {
            kind: ChangeKind::Delete,
            table: T::TABLE,
            key_column: T::KEY,
            key: Some(key),
            columns: T::COLUMNS,
            values: Vec::new(),
        }
    }

    fn touches(&self, table: &str, key: &Value) -> bool {
        self.table == table && self.key.as_ref() == Some(key)
    }

    fn apply(&self, tx: &Transaction<'_>) -> DbResult<usize> {
        let table = quote_identifier(self.table);
        let key_column = quote_identifier(self.key_column);
        let (sql, binds) = match self.kind {
            ChangeKind::Insert => {
                let mut columns: Vec<String> =
                    self.columns.iter().map(|name| quote_identifier(name)).collect();
                let mut binds = self.values.clone();
                if let Some(key) = &self.key {
                    columns.insert(0, key_column);
                    binds.insert(0, key.clone());
                }
                let placeholders = (1..=binds.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                (
                    format!(
                        "INSERT INTO {table} ({}) VALUES ({placeholders});",
                        columns.join(", ")
                    ),
                    binds,
                )
            }
            ChangeKind::Update => {
                let assignments = self
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(index, name)| format!("{} = ?{}", quote_identifier(name), index + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut binds = self.values.clone();
                binds.extend(self.key.clone());
                (
                    format!(
                        "UPDATE {table} SET {assignments} WHERE {key_column} = ?{};",
                        binds.len()
                    ),
                    binds,
                )
            }
            ChangeKind::Delete => (
                format!("DELETE FROM {table} WHERE {key_column} = ?1;"),
                self.key.clone().into_iter().collect(),
            ),
        };

        let affected = tx.execute(&sql, params_from_iter(binds.iter()))?;
        if self.kind != ChangeKind::Insert && affected == 0 {
            return Err(DbError::StaleChange {
                kind: self.kind,
                table: self.table,
                key: self.key.as_ref().map_or_else(|| "NULL".to_string(), describe_value),
            });
        }
        Ok(affected)
    }
}

/// Ordered set of changes waiting for the next flush.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    pending: Vec<PendingChange>,
}

impl ChangeSet {
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Registers `change`; returns `false` when it folds into an identical
    /// pending intent (a second delete of the same key).
    pub(crate) fn push(&mut self, change: PendingChange) -> bool {
        let latest = change
            .key
            .as_ref()
            .and_then(|key| self.latest_for(change.table, key));
        match (change.kind, latest) {
            (ChangeKind::Update, Some(index)) if self.pending[index].kind == ChangeKind::Update => {
                self.pending.remove(index);
            }
            (ChangeKind::Delete, Some(index)) => match self.pending[index].kind {
                ChangeKind::Delete => return false,
                ChangeKind::Update => {
                    self.pending.remove(index);
                }
                ChangeKind::Insert => {}
            },
            _ => {}
        }
        self.pending.push(change);
        true
    }

    /// Index of the most recent pending change for `(table, key)`.
    fn latest_for(&self, table: &str, key: &Value) -> Option<usize> {
        self.pending
            .iter()
            .rposition(|pending| pending.touches(table, key))
    }

    pub(crate) fn snapshot(&self) -> Vec<PendingChange> {
        self.pending.clone()
    }

    /// Drops the first `count` changes after they were flushed.
    pub(crate) fn discard_flushed(&mut self, count: usize) {
        let count = count.min(self.pending.len());
        self.pending.drain(..count);
    }

    pub(crate) fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

/// Applies `changes` in one IMMEDIATE transaction and returns affected rows.
pub(crate) fn flush(conn: &mut Connection, changes: &[PendingChange]) -> DbResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut affected = 0;
    for change in changes {
        affected += change.apply(&tx)?;
    }
    tx.commit()?;
    Ok(affected)
}

pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => format!("'{text}'"),
        Value::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::{flush, ChangeKind, ChangeSet, PendingChange};
    use crate::db::DbError;
    use crate::model::entity::Entity;
    use rusqlite::types::Value;
    use rusqlite::{Connection, Row};

    struct Tag {
        id: Option<i64>,
        name: String,
    }

    impl Entity for Tag {
        const TABLE: &'static str = "tags";
        const KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["name"];

        fn key(&self) -> Option<Value> {
            self.id.map(Value::Integer)
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Text(self.name.clone())]
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        }
    }

    fn tag(id: Option<i64>, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_string(),
        }
    }

    fn tags_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
            .unwrap();
        conn
    }

    #[test]
    fn repeated_update_replaces_pending_entry() {
        let mut changes = ChangeSet::default();
        let first = tag(Some(1), "a");
        let second = tag(Some(1), "b");
        changes.push(PendingChange::update(Value::Integer(1), &first));
        changes.push(PendingChange::update(Value::Integer(1), &second));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes.snapshot()[0].values, vec![Value::Text("b".to_string())]);
    }

    #[test]
    fn delete_supersedes_pending_update_and_is_not_duplicated() {
        let mut changes = ChangeSet::default();
        changes.push(PendingChange::update(Value::Integer(7), &tag(Some(7), "x")));
        changes.push(PendingChange::delete::<Tag>(Value::Integer(7)));
        changes.push(PendingChange::delete::<Tag>(Value::Integer(7)));

        let snapshot = changes.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kind, ChangeKind::Delete);
    }

    #[test]
    fn delete_after_reinsert_of_same_key_is_registered() {
        let mut changes = ChangeSet::default();
        assert!(changes.push(PendingChange::delete::<Tag>(Value::Integer(3))));
        assert!(changes.push(PendingChange::insert(&tag(Some(3), "back"))));
        assert!(changes.push(PendingChange::delete::<Tag>(Value::Integer(3))));
        assert!(!changes.push(PendingChange::delete::<Tag>(Value::Integer(3))));

        let kinds: Vec<ChangeKind> = changes.snapshot().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Delete, ChangeKind::Insert, ChangeKind::Delete]
        );
    }

    struct Member {
        id: Option<i64>,
        team_id: i64,
    }

    impl Entity for Member {
        const TABLE: &'static str = "members";
        const KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["team_id"];

        fn key(&self) -> Option<Value> {
            self.id.map(Value::Integer)
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Integer(self.team_id)]
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                team_id: row.get("team_id")?,
            })
        }
    }

    #[test]
    fn repeated_update_runs_after_changes_registered_in_between() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE members (
                 id INTEGER PRIMARY KEY,
                 team_id INTEGER NOT NULL REFERENCES tags(id)
             );
             INSERT INTO tags (id, name) VALUES (1, 'old');
             INSERT INTO members (id, team_id) VALUES (10, 1);",
        )
        .unwrap();

        let mut changes = ChangeSet::default();
        let member = |team_id| Member {
            id: Some(10),
            team_id,
        };
        changes.push(PendingChange::update(Value::Integer(10), &member(1)));
        changes.push(PendingChange::insert(&tag(Some(2), "new")));
        changes.push(PendingChange::update(Value::Integer(10), &member(2)));

        let snapshot = changes.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].kind, ChangeKind::Insert);
        assert_eq!(snapshot[1].kind, ChangeKind::Update);

        assert_eq!(flush(&mut conn, &snapshot).unwrap(), 2);
        let team_id: i64 = conn
            .query_row("SELECT team_id FROM members WHERE id = 10", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(team_id, 2);
    }

    #[test]
    fn flush_applies_changes_in_order() {
        let mut conn = tags_conn();
        let changes = vec![
            PendingChange::insert(&tag(Some(1), "rust")),
            PendingChange::insert(&tag(None, "sqlite")),
            PendingChange::update(Value::Integer(1), &tag(Some(1), "rustlang")),
        ];

        assert_eq!(flush(&mut conn, &changes).unwrap(), 3);
        let names: Vec<String> = conn
            .prepare("SELECT name FROM tags ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["rustlang".to_string(), "sqlite".to_string()]);
    }

    #[test]
    fn stale_update_rolls_back_whole_flush() {
        let mut conn = tags_conn();
        let changes = vec![
            PendingChange::insert(&tag(None, "kept?")),
            PendingChange::update(Value::Integer(42), &tag(Some(42), "ghost")),
        ];

        let err = flush(&mut conn, &changes).unwrap_err();
        assert!(matches!(
            err,
            DbError::StaleChange {
                kind: ChangeKind::Update,
                table: "tags",
                ..
            }
        ));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn discard_flushed_keeps_later_registrations() {
        let mut changes = ChangeSet::default();
        changes.push(PendingChange::insert(&tag(None, "a")));
        changes.push(PendingChange::insert(&tag(None, "b")));
        changes.push(PendingChange::insert(&tag(None, "c")));

        changes.discard_flushed(2);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.clear(), 1);
        assert!(changes.is_empty());
    }
}
