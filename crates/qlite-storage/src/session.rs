// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing handle to one admitted connection.
//!
//! A session is either `Open` or `Closed`. Every data operation follows the
//! same protocol: check state, submit the call to the worker, wait on the
//! mailbox for the tagged outcome, then return the reply or the failure the
//! engine raised. Operations take `&mut self`, so one session never has more
//! than one call in flight.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use qlite_core::{QliteError, Resource, Row, SessionState, Value};

use crate::gate::Permit;
use crate::mailbox::{mailbox, Mailbox};
use crate::metrics;
use crate::worker::{Call, Reply, Worker};

/// Worker and mailbox of an open session.
#[derive(Debug)]
struct Link {
    worker: Worker,
    mailbox: Mailbox,
}

/// Exclusive, admitted use of the underlying database.
///
/// Obtained from [`Database::open`](crate::Database::open). Close it with
/// [`close`](Self::close); a session dropped while open releases its
/// connection and permit in the background.
#[derive(Debug)]
pub struct Session {
    id: u64,
    location: String,
    state: SessionState,
    has_cursor: bool,
    link: Option<Link>,
    seq: u64,
    call_timeout: Option<Duration>,
    opened_at: Instant,
}

impl Session {
    /// Binds a freshly opened resource to a new worker and mailbox.
    pub(crate) fn start<R: Resource>(
        id: u64,
        location: String,
        resource: R,
        permit: Permit,
        call_timeout: Option<Duration>,
    ) -> Self {
        let (outbox, mailbox) = mailbox();
        let worker = Worker::spawn(resource, outbox, permit, id);
        info!(session = id, location = %location, "session opened");
        metrics::record_session_opened();
        Self {
            id,
            location,
            state: SessionState::Open,
            has_cursor: false,
            link: Some(Link { worker, mailbox }),
            seq: 0,
            call_timeout,
            opened_at: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// True once an execute/executemany has succeeded and no later one failed.
    pub fn has_cursor(&self) -> bool {
        self.has_cursor
    }

    /// Deadline applied to each call's result wait.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Sets (or clears) the per-call deadline.
    pub fn set_call_timeout(&mut self, timeout: Option<Duration>) {
        self.call_timeout = timeout;
    }

    /// Runs one statement. The session remembers its result rows for
    /// [`fetchone`](Self::fetchone) / [`fetchall`](Self::fetchall).
    ///
    /// Returns `self` so a fetch can be chained onto the execute.
    ///
    /// Any failure clears the active cursor, including a [`QliteError::Timeout`]:
    /// the abandoned statement may still replace the cursor on the worker, so
    /// rows from an earlier execute are no longer reachable and a fetch fails
    /// with [`QliteError::NoActiveCursor`] until the next successful execute.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<&mut Self, QliteError> {
        let result = self
            .call(Call::Execute {
                sql: sql.to_string(),
                params: params.to_vec(),
            })
            .await;
        self.after_execute(result)
    }

    /// Runs one statement once per parameter set. Clears the active cursor on
    /// failure the same way [`execute`](Self::execute) does.
    pub async fn executemany(
        &mut self,
        sql: &str,
        param_sets: &[Vec<Value>],
    ) -> Result<&mut Self, QliteError> {
        let result = self
            .call(Call::ExecuteMany {
                sql: sql.to_string(),
                param_sets: param_sets.to_vec(),
            })
            .await;
        self.after_execute(result)
    }

    /// Next row of the active cursor, `None` once exhausted.
    pub async fn fetchone(&mut self) -> Result<Option<Row>, QliteError> {
        self.require_cursor()?;
        match self.call(Call::FetchOne).await? {
            Reply::Row(row) => Ok(row),
            other => Err(unexpected_reply("fetchone", &other)),
        }
    }

    /// All remaining rows of the active cursor.
    pub async fn fetchall(&mut self) -> Result<Vec<Row>, QliteError> {
        self.require_cursor()?;
        match self.call(Call::FetchAll).await? {
            Reply::Rows(rows) => Ok(rows),
            other => Err(unexpected_reply("fetchall", &other)),
        }
    }

    /// Commits the pending transaction.
    pub async fn commit(&mut self) -> Result<(), QliteError> {
        match self.call(Call::Commit).await? {
            Reply::Committed => Ok(()),
            other => Err(unexpected_reply("commit", &other)),
        }
    }

    /// Closes the resource and returns the permit to the gate.
    ///
    /// Closing an already closed session is a no-op. If the resource fails to
    /// close, the permit is still released and the engine error is returned.
    pub async fn close(&mut self) -> Result<(), QliteError> {
        let Some(Link { worker, mailbox }) = self.link.take() else {
            debug!(session = self.id, "close on closed session ignored");
            return Ok(());
        };
        self.state = SessionState::Closed;
        self.has_cursor = false;

        // Hang up the mailbox first so a worker blocked on delivering an
        // abandoned result can finish.
        drop(mailbox);
        let result = worker.shutdown().await;

        let open_for = self.opened_at.elapsed();
        metrics::record_session_closed(open_for);
        match &result {
            Ok(()) => info!(session = self.id, ?open_for, "session closed"),
            Err(e) => warn!(session = self.id, error = %e, "session closed with error"),
        }
        result
    }

    fn require_cursor(&self) -> Result<(), QliteError> {
        if !self.is_open() {
            return Err(QliteError::SessionClosed);
        }
        if !self.has_cursor {
            return Err(QliteError::NoActiveCursor);
        }
        Ok(())
    }

    fn after_execute(&mut self, result: Result<Reply, QliteError>) -> Result<&mut Self, QliteError> {
        match result {
            Ok(Reply::Executed) => {
                self.has_cursor = true;
                Ok(self)
            }
            Ok(other) => {
                self.has_cursor = false;
                Err(unexpected_reply("execute", &other))
            }
            Err(QliteError::SessionClosed) => Err(QliteError::SessionClosed),
            Err(e) => {
                self.has_cursor = false;
                Err(e)
            }
        }
    }

    /// Submit, wait, and unwrap one call.
    async fn call(&mut self, call: Call) -> Result<Reply, QliteError> {
        let op = call.name();
        let Some(link) = self.link.as_mut() else {
            return Err(QliteError::SessionClosed);
        };

        self.seq += 1;
        let seq = self.seq;
        debug!(session = self.id, seq, op, "submitting call");
        let started = Instant::now();

        link.worker.submit(seq, call)?;
        let outcome = link.mailbox.take(seq, self.call_timeout).await;

        metrics::record_call(op, &outcome, started.elapsed());
        if let Err(QliteError::Timeout { duration }) = &outcome {
            warn!(session = self.id, seq, op, ?duration, "call timed out");
        }
        outcome
    }
}

fn unexpected_reply(op: &str, reply: &Reply) -> QliteError {
    QliteError::Worker(format!("unexpected reply to {op}: {reply:?}"))
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.link.is_some() {
            warn!(
                session = self.id,
                "session dropped without close; releasing connection in the background"
            );
            metrics::record_session_closed(self.opened_at.elapsed());
        }
    }
}
