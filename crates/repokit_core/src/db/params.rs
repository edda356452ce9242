//! Bind parameters for raw SQL commands and queries.

use rusqlite::types::{ToSql, Value};
use rusqlite::{params_from_iter, Rows, Statement};

/// Parameters passed verbatim to a raw statement.
///
/// Named parameter names include their SQLite prefix (`:id`, `@id`, `$id`).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParams {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl SqlParams {
    pub fn none() -> Self {
        Self::Positional(Vec::new())
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn execute(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        match self {
            Self::Positional(values) => stmt.execute(params_from_iter(values.iter())),
            Self::Named(pairs) => stmt.execute(named_refs(pairs).as_slice()),
        }
    }

    pub(crate) fn query<'stmt>(
        &self,
        stmt: &'stmt mut Statement<'_>,
    ) -> rusqlite::Result<Rows<'stmt>> {
        match self {
            Self::Positional(values) => stmt.query(params_from_iter(values.iter())),
            Self::Named(pairs) => stmt.query(named_refs(pairs).as_slice()),
        }
    }
}

impl Default for SqlParams {
    fn default() -> Self {
        Self::none()
    }
}

fn named_refs(pairs: &[(String, Value)]) -> Vec<(&str, &dyn ToSql)> {
    pairs
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}
