//! Work session: one connection, one pending change set.
//!
//! # Responsibility
//! - Own the SQLite connection and close it exactly once.
//! - Hold changes registered by repositories until the next flush.
//! - Route store calls through a [`Scheduler`] so blocking and suspending
//!   callers share one implementation.
//!
//! # Invariants
//! - Repositories reach the session through a `Weak` handle only.
//! - Store calls never run on a closed connection.
//! - Registering changes never waits on the connection lock.

use super::changes::{ChangeSet, PendingChange};
use super::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use uuid::Uuid;

/// SQLite connection plus the changes waiting to be flushed to it.
///
/// A session is exclusively owned; it is not `Clone`.
pub struct Session {
    state: Arc<SessionState>,
}

pub(crate) struct SessionState {
    id: Uuid,
    closed: AtomicBool,
    conn: Mutex<Option<Connection>>,
    changes: Mutex<ChangeSet>,
}

impl Session {
    /// Wraps an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            state: Arc::new(SessionState {
                id: Uuid::new_v4(),
                closed: AtomicBool::new(false),
                conn: Mutex::new(Some(conn)),
                changes: Mutex::new(ChangeSet::default()),
            }),
        }
    }

    /// Identifier used to correlate log events of this session.
    pub fn id(&self) -> Uuid {
        self.state.id
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Closes the connection.
    ///
    /// Returns `Ok(true)` when this call closed it and `Ok(false)` when it was
    /// already closed.
    pub fn close(&self) -> DbResult<bool> {
        self.state.closed.store(true, Ordering::Release);
        let taken = match self.state.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(conn) = taken else {
            return Ok(false);
        };

        match conn.close() {
            Ok(()) => {
                info!(
                    "event=session_close module=db status=ok session_id={}",
                    self.state.id
                );
                Ok(true)
            }
            Err((_conn, err)) => {
                warn!(
                    "event=session_close module=db status=error session_id={} error={}",
                    self.state.id, err
                );
                Err(err.into())
            }
        }
    }

    pub(crate) fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionState> {
        Arc::downgrade(&self.state)
    }
}

impl SessionState {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn with_connection<R>(
        &self,
        call: impl FnOnce(&mut Connection) -> DbResult<R>,
    ) -> DbResult<R> {
        let mut guard = self.conn.lock().map_err(|_| DbError::SessionPoisoned)?;
        let conn = guard.as_mut().ok_or(DbError::SessionClosed)?;
        call(conn)
    }

    pub(crate) fn changes(&self) -> DbResult<MutexGuard<'_, ChangeSet>> {
        self.changes.lock().map_err(|_| DbError::SessionPoisoned)
    }

    /// Registers changes atomically with respect to other registrations.
    ///
    /// Returns how many were registered; a change folded into an identical
    /// pending one is not counted.
    pub(crate) fn register(&self, changes: Vec<PendingChange>) -> DbResult<usize> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::SessionClosed);
        }
        let mut pending = self.changes()?;
        Ok(changes
            .into_iter()
            .map(|change| pending.push(change))
            .filter(|registered| *registered)
            .count())
    }
}

/// Drives a store call either inline or cooperatively.
pub(crate) trait Scheduler {
    fn run<R, F>(state: Arc<SessionState>, call: F) -> impl Future<Output = DbResult<R>> + Send
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> DbResult<R> + Send + 'static;
}

/// Runs the store call on the calling thread; the future is ready at once.
pub(crate) struct Blocking;

/// Runs the store call on the tokio blocking pool, or inline when no tokio
/// runtime is current.
pub(crate) struct Cooperative;

impl Scheduler for Blocking {
    fn run<R, F>(state: Arc<SessionState>, call: F) -> impl Future<Output = DbResult<R>> + Send
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> DbResult<R> + Send + 'static,
    {
        std::future::ready(state.with_connection(call))
    }
}

impl Scheduler for Cooperative {
    fn run<R, F>(state: Arc<SessionState>, call: F) -> impl Future<Output = DbResult<R>> + Send
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> DbResult<R> + Send + 'static,
    {
        run_on_blocking_pool(state, call)
    }
}

async fn run_on_blocking_pool<R, F>(state: Arc<SessionState>, call: F) -> DbResult<R>
where
    R: Send + 'static,
    F: FnOnce(&mut Connection) -> DbResult<R> + Send + 'static,
{
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return state.with_connection(call);
    };
    runtime
        .spawn_blocking(move || state.with_connection(call))
        .await
        .map_err(|err| DbError::Scheduler(err.to_string()))?
}

/// Drives a future produced with the [`Blocking`] scheduler to completion.
pub(crate) fn run_blocking<O>(future: impl Future<Output = O>) -> O {
    futures::executor::block_on(future)
}
