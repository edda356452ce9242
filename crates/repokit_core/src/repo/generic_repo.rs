//! Generic repository bound to one work session.
//!
//! # Responsibility
//! - Provide get/list/page/exists reads and insert/update/delete
//!   registrations for one entity type.
//! - Pass raw SQL commands and row-mapped queries through to the store.
//!
//! # Invariants
//! - Every blocking operation and its `_async` twin share one implementation;
//!   only the scheduler differs.
//! - Argument checks run before anything is registered, so a rejected call
//!   leaves the pending change set untouched.
//! - `delete_where` reads the matching rows once and registers exactly those.

use super::{sql, RepoError, RepoResult};
use crate::db::changes::PendingChange;
use crate::db::session::{run_blocking, Blocking, Cooperative, Scheduler, SessionState};
use crate::db::{DbError, SqlParams};
use crate::model::entity::Entity;
use crate::model::status::{DataResult, StatusResult};
use crate::query::{OrderBy, Predicate, Query, Window};
use log::{debug, warn};
use rusqlite::types::Value;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// CRUD and query facade over the table of `T`.
///
/// Obtained from [`UnitOfWork::repository`](crate::UnitOfWork::repository);
/// it holds a non-owning handle to the session, so every operation fails
/// with "session is closed" once the unit of work is disposed.
pub struct Repository<T> {
    session: Weak<SessionState>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    pub(crate) fn new(session: Weak<SessionState>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// First entity matching `filter`; `None` (still a success) when nothing matches.
    pub fn get(&self, filter: Predicate<T>) -> DataResult<Option<T>> {
        self.settle("get", run_blocking(self.try_get::<Blocking>(filter)))
    }

    pub async fn get_async(&self, filter: Predicate<T>) -> DataResult<Option<T>> {
        self.settle("get", self.try_get::<Cooperative>(filter).await)
    }

    /// All entities accepted by `filter` (everything when `None`), ordered by
    /// `order` (natural store order when `None`).
    ///
    /// The sequence is materialized when this call returns.
    pub fn get_all(
        &self,
        filter: Option<Predicate<T>>,
        order: Option<OrderBy<T>>,
    ) -> DataResult<Vec<T>> {
        self.settle(
            "get_all",
            run_blocking(self.try_query::<Blocking>(Query::new(filter, order))),
        )
    }

    pub async fn get_all_async(
        &self,
        filter: Option<Predicate<T>>,
        order: Option<OrderBy<T>>,
    ) -> DataResult<Vec<T>> {
        self.settle(
            "get_all",
            self.try_query::<Cooperative>(Query::new(filter, order)).await,
        )
    }

    /// Page `page_index` (1-based) of `page_size` items, taken after filter and order.
    pub fn get_all_by_paging(
        &self,
        page_index: u32,
        page_size: u32,
        order: Option<OrderBy<T>>,
        filter: Option<Predicate<T>>,
    ) -> DataResult<Vec<T>> {
        let outcome = match paged_query(page_index, page_size, order, filter) {
            Ok(query) => run_blocking(self.try_query::<Blocking>(query)),
            Err(err) => Err(err),
        };
        self.settle("get_all_by_paging", outcome)
    }

    pub async fn get_all_by_paging_async(
        &self,
        page_index: u32,
        page_size: u32,
        order: Option<OrderBy<T>>,
        filter: Option<Predicate<T>>,
    ) -> DataResult<Vec<T>> {
        let outcome = match paged_query(page_index, page_size, order, filter) {
            Ok(query) => self.try_query::<Cooperative>(query).await,
            Err(err) => Err(err),
        };
        self.settle("get_all_by_paging", outcome)
    }

    /// Registers `items` as pending inserts; returns how many were registered.
    pub fn insert(&self, items: &[T]) -> DataResult<usize> {
        self.settle("insert", self.try_insert(items))
    }

    pub async fn insert_async(&self, items: &[T]) -> DataResult<usize> {
        self.insert(items)
    }

    /// Marks `item` as modified, attaching it to the session if needed.
    ///
    /// An item without identity is rejected.
    pub fn update(&self, item: &T) -> StatusResult {
        let outcome = self.try_update(item);
        let (_, status) = self.settle("update", outcome).into_parts();
        status
    }

    pub async fn update_async(&self, item: &T) -> StatusResult {
        self.update(item)
    }

    /// Marks `items` for removal; returns how many were marked.
    ///
    /// An item whose key already has a pending delete is not marked again.
    pub fn delete(&self, items: &[T]) -> DataResult<usize> {
        self.settle("delete", self.try_delete(items))
    }

    pub async fn delete_async(&self, items: &[T]) -> DataResult<usize> {
        self.delete(items)
    }

    /// Marks every entity currently matching `filter` for removal and returns
    /// the match count.
    pub fn delete_where(&self, filter: Predicate<T>) -> DataResult<usize> {
        self.settle(
            "delete_where",
            run_blocking(self.try_delete_where::<Blocking>(filter)),
        )
    }

    pub async fn delete_where_async(&self, filter: Predicate<T>) -> DataResult<usize> {
        self.settle(
            "delete_where",
            self.try_delete_where::<Cooperative>(filter).await,
        )
    }

    /// Whether at least one entity matches `filter`; `false` on failure.
    pub fn exists(&self, filter: Predicate<T>) -> DataResult<bool> {
        self.settle("exists", run_blocking(self.try_exists::<Blocking>(filter)))
    }

    pub async fn exists_async(&self, filter: Predicate<T>) -> DataResult<bool> {
        self.settle("exists", self.try_exists::<Cooperative>(filter).await)
    }

    /// Runs `command` immediately and returns the affected row count.
    pub fn execute_raw_command(&self, command: &str, params: SqlParams) -> DataResult<usize> {
        self.settle(
            "execute_raw_command",
            run_blocking(self.try_execute_raw::<Blocking>(command, params)),
        )
    }

    pub async fn execute_raw_command_async(
        &self,
        command: &str,
        params: SqlParams,
    ) -> DataResult<usize> {
        self.settle(
            "execute_raw_command",
            self.try_execute_raw::<Cooperative>(command, params).await,
        )
    }

    /// Runs `command` immediately and maps each returned row into `T`.
    pub fn raw_query(&self, command: &str, params: SqlParams) -> DataResult<Vec<T>> {
        self.settle(
            "raw_query",
            run_blocking(self.try_raw_query::<Blocking>(command, params)),
        )
    }

    pub async fn raw_query_async(&self, command: &str, params: SqlParams) -> DataResult<Vec<T>> {
        self.settle(
            "raw_query",
            self.try_raw_query::<Cooperative>(command, params).await,
        )
    }

    async fn try_get<S: Scheduler>(&self, filter: Predicate<T>) -> RepoResult<Option<T>> {
        let session = self.session()?;
        Ok(S::run(session, move |conn| sql::find_first(conn, &filter)).await?)
    }

    async fn try_query<S: Scheduler>(&self, query: Query<T>) -> RepoResult<Vec<T>> {
        let session = self.session()?;
        let items = S::run(session, move |conn| match query.window {
            Some(window) if query.is_unrestricted() => sql::load_window(conn, window),
            _ => Ok(query.evaluate(sql::load_all(conn)?)),
        })
        .await?;
        Ok(items)
    }

    async fn try_exists<S: Scheduler>(&self, filter: Predicate<T>) -> RepoResult<bool> {
        let session = self.session()?;
        let found = S::run(session, move |conn| sql::find_first(conn, &filter)).await?;
        Ok(found.is_some())
    }

    async fn try_delete_where<S: Scheduler>(&self, filter: Predicate<T>) -> RepoResult<usize> {
        let session = self.session()?;
        let matches = S::run(Arc::clone(&session), move |conn| {
            sql::load_matching(conn, &filter)
        })
        .await?;
        let changes = matches
            .iter()
            .map(|item| identity_of(item).map(PendingChange::delete::<T>))
            .collect::<RepoResult<Vec<_>>>()?;
        let count = session.register(changes)?;
        debug!(
            "event=repo_register module=repo status=ok op=delete_where table={} session_id={} count={}",
            T::TABLE,
            session.id(),
            count
        );
        Ok(count)
    }

    async fn try_execute_raw<S: Scheduler>(
        &self,
        command: &str,
        params: SqlParams,
    ) -> RepoResult<usize> {
        let command = non_empty_command(command)?;
        let session = self.session()?;
        Ok(S::run(session, move |conn| sql::execute_raw(conn, &command, &params)).await?)
    }

    async fn try_raw_query<S: Scheduler>(
        &self,
        command: &str,
        params: SqlParams,
    ) -> RepoResult<Vec<T>> {
        let command = non_empty_command(command)?;
        let session = self.session()?;
        Ok(S::run(session, move |conn| sql::query_raw(conn, &command, &params)).await?)
    }

    fn try_insert(&self, items: &[T]) -> RepoResult<usize> {
        if items.is_empty() {
            return Err(RepoError::InvalidArgument(
                "items to insert cannot be empty".to_string(),
            ));
        }
        let session = self.session()?;
        let count = session.register(items.iter().map(PendingChange::insert).collect())?;
        debug!(
            "event=repo_register module=repo status=ok op=insert table={} session_id={} count={}",
            T::TABLE,
            session.id(),
            count
        );
        Ok(count)
    }

    fn try_update(&self, item: &T) -> RepoResult<()> {
        let key = identity_of(item)?;
        let session = self.session()?;
        session.register(vec![PendingChange::update(key, item)])?;
        Ok(())
    }

    fn try_delete(&self, items: &[T]) -> RepoResult<usize> {
        if items.is_empty() {
            return Err(RepoError::InvalidArgument(
                "items to delete cannot be empty".to_string(),
            ));
        }
        let changes = items
            .iter()
            .map(|item| identity_of(item).map(PendingChange::delete::<T>))
            .collect::<RepoResult<Vec<_>>>()?;
        let session = self.session()?;
        Ok(session.register(changes)?)
    }

    fn session(&self) -> RepoResult<Arc<SessionState>> {
        self.session
            .upgrade()
            .ok_or(RepoError::Db(DbError::SessionClosed))
    }

    fn settle<D: Default>(&self, op: &'static str, outcome: RepoResult<D>) -> DataResult<D> {
        if let Err(err) = &outcome {
            warn!(
                "event=repo_op module=repo status=error op={} table={} error={}",
                op,
                T::TABLE,
                err
            );
        }
        DataResult::from_result(outcome)
    }
}

fn identity_of<T: Entity>(item: &T) -> RepoResult<Value> {
    match item.key() {
        Some(Value::Null) | None => Err(RepoError::InvalidArgument(format!(
            "`{}` item has no `{}` identity",
            T::TABLE,
            T::KEY
        ))),
        Some(key) => Ok(key),
    }
}

fn non_empty_command(command: &str) -> RepoResult<String> {
    if command.trim().is_empty() {
        return Err(RepoError::InvalidArgument(
            "command text cannot be empty".to_string(),
        ));
    }
    Ok(command.to_string())
}

fn paged_query<T: Entity>(
    page_index: u32,
    page_size: u32,
    order: Option<OrderBy<T>>,
    filter: Option<Predicate<T>>,
) -> RepoResult<Query<T>> {
    let window = Window::page(page_index, page_size).map_err(RepoError::InvalidArgument)?;
    Ok(Query::new(filter, order).with_window(window))
}
