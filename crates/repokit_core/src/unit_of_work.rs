//! Unit of work: one session, one repository per entity type, one commit point.
//!
//! # Responsibility
//! - Own the session exclusively and release it deterministically.
//! - Hand out a cached repository per entity type.
//! - Flush every pending change registered through those repositories in a
//!   single transaction.
//!
//! # Invariants
//! - Repeated `repository::<T>()` calls return the same `Arc` (pointer-equal).
//! - The session is closed exactly once, by `dispose` or on drop.
//! - A failed save keeps its changes pending; a successful save removes
//!   exactly the changes it flushed.
//! - Not synchronized: the repository cache is plain mutable state, guarded
//!   by `&mut self`.

use crate::db::changes::flush;
use crate::db::session::{run_blocking, Blocking, Cooperative, Scheduler};
use crate::db::{open_session, open_session_in_memory, DbError, DbResult, Session, SessionOptions};
use crate::model::entity::Entity;
use crate::model::status::StatusResult;
use crate::repo::generic_repo::Repository;
use log::{debug, error, info, warn};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct UnitOfWork {
    session: Session,
    repositories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    disposed: bool,
}

impl UnitOfWork {
    /// Takes ownership of an externally supplied session.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            repositories: HashMap::new(),
            disposed: false,
        }
    }

    /// Opens a file-backed session and wraps it.
    pub fn open(path: impl AsRef<Path>, options: &SessionOptions) -> DbResult<Self> {
        Ok(Self::new(open_session(path, options)?))
    }

    /// Opens a private in-memory session and wraps it.
    pub fn open_in_memory(options: &SessionOptions) -> DbResult<Self> {
        Ok(Self::new(open_session_in_memory(options)?))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Repository for `T`, created and cached on first request.
    pub fn repository<T: Entity>(&mut self) -> Arc<Repository<T>> {
        let type_key = TypeId::of::<T>();
        if let Some(cached) = self
            .repositories
            .get(&type_key)
            .and_then(|entry| entry.downcast_ref::<Arc<Repository<T>>>())
        {
            return Arc::clone(cached);
        }

        let repository = Arc::new(Repository::<T>::new(self.session.downgrade()));
        self.repositories
            .insert(type_key, Box::new(Arc::clone(&repository)));
        debug!(
            "event=uow_repository module=uow status=created session_id={} table={} cached={}",
            self.session.id(),
            T::TABLE,
            self.repositories.len()
        );
        repository
    }

    /// Number of changes waiting for the next save.
    pub fn pending_changes(&self) -> usize {
        self.session
            .state()
            .changes()
            .map_or(0, |changes| changes.len())
    }

    /// Drops every pending change without touching the store.
    pub fn discard_changes(&self) -> usize {
        let discarded = self.clear_pending();
        if discarded > 0 {
            info!(
                "event=uow_discard module=uow status=ok session_id={} changes={}",
                self.session.id(),
                discarded
            );
        }
        discarded
    }

    /// Flushes all pending changes in one transaction.
    pub fn save(&self) -> StatusResult {
        let started_at = Instant::now();
        self.settle_save(started_at, run_blocking(self.try_save::<Blocking>()))
    }

    pub async fn save_async(&self) -> StatusResult {
        let started_at = Instant::now();
        self.settle_save(started_at, self.try_save::<Cooperative>().await)
    }

    /// Closes the session and drops cached repositories.
    ///
    /// Later calls are no-ops returning success.
    pub fn dispose(&mut self) -> StatusResult {
        if self.disposed {
            return StatusResult::success();
        }
        self.disposed = true;

        let abandoned = self.clear_pending();
        if abandoned > 0 {
            warn!(
                "event=uow_dispose module=uow status=discarded session_id={} changes={}",
                self.session.id(),
                abandoned
            );
        }
        self.repositories.clear();

        match self.session.close() {
            Ok(_) => {
                debug!(
                    "event=uow_dispose module=uow status=ok session_id={}",
                    self.session.id()
                );
                StatusResult::success()
            }
            Err(err) => StatusResult::failure(err.to_string()),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    async fn try_save<S: Scheduler>(&self) -> DbResult<(usize, usize)> {
        if self.disposed {
            return Err(DbError::SessionClosed);
        }
        let state = Arc::clone(self.session.state());
        let snapshot = state.changes()?.snapshot();
        if snapshot.is_empty() {
            return Ok((0, 0));
        }

        let flushed = snapshot.len();
        let affected = S::run(Arc::clone(&state), move |conn| flush(conn, &snapshot)).await?;
        state.changes()?.discard_flushed(flushed);
        Ok((flushed, affected))
    }

    fn settle_save(&self, started_at: Instant, outcome: DbResult<(usize, usize)>) -> StatusResult {
        match outcome {
            Ok((changes, rows)) => {
                info!(
                    "event=uow_save module=uow status=ok session_id={} changes={} rows={} duration_ms={}",
                    self.session.id(),
                    changes,
                    rows,
                    started_at.elapsed().as_millis()
                );
                StatusResult::success()
            }
            Err(err) => {
                error!(
                    "event=uow_save module=uow status=error session_id={} pending={} error={}",
                    self.session.id(),
                    self.pending_changes(),
                    err
                );
                StatusResult::failure(err.to_string())
            }
        }
    }

    fn clear_pending(&self) -> usize {
        match self.session.state().changes() {
            Ok(mut changes) => changes.clear(),
            Err(_) => 0,
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        let status = self.dispose();
        if !status.is_success() {
            warn!(
                "event=uow_dispose module=uow status=error session_id={} error={}",
                self.session.id(),
                status
            );
        }
    }
}

impl From<Session> for UnitOfWork {
    fn from(session: Session) -> Self {
        Self::new(session)
    }
}
