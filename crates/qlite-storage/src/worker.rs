// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial blocking-call worker bound to one session.
//!
//! The worker owns the [`Resource`] and the admission [`Permit`] for the
//! lifetime of its session. It runs as a single task on tokio's blocking
//! pool, pulling calls off an unbounded queue in submission order and
//! depositing each tagged outcome into the session's mailbox.
//!
//! When the session hangs up (explicit close or drop) the loop ends, the
//! resource is closed, and only then is the permit released. A panic inside
//! the resource unwinds through the same path: the permit is dropped and the
//! waiting caller sees its mailbox close.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument as _};

use qlite_core::{BoxError, QliteError, Resource, Row, Value};

use crate::gate::Permit;
use crate::mailbox::{Outbox, Outcome};

/// A description of one blocking call.
#[derive(Debug, Clone)]
pub enum Call {
    Execute { sql: String, params: Vec<Value> },
    ExecuteMany { sql: String, param_sets: Vec<Vec<Value>> },
    FetchOne,
    FetchAll,
    Commit,
}

impl Call {
    /// Operation name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Execute { .. } => "execute",
            Call::ExecuteMany { .. } => "executemany",
            Call::FetchOne => "fetchone",
            Call::FetchAll => "fetchall",
            Call::Commit => "commit",
        }
    }
}

/// Successful result of a [`Call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Executed,
    Row(Option<Row>),
    Rows(Vec<Row>),
    Committed,
}

#[derive(Debug)]
struct Job {
    seq: u64,
    call: Call,
}

/// Handle to a running worker.
#[derive(Debug)]
pub struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<Result<(), BoxError>>,
}

impl Worker {
    /// Moves `resource` and `permit` onto a blocking-pool task and starts
    /// serving calls. Must be called from within a tokio runtime.
    pub fn spawn<R: Resource>(resource: R, outbox: Outbox, permit: Permit, session: u64) -> Self {
        let (jobs, queue) = mpsc::unbounded_channel();
        let span = tracing::debug_span!("worker", session);
        let handle =
            tokio::task::spawn_blocking(move || span.in_scope(|| run(resource, queue, outbox, permit)));
        Self { jobs, handle }
    }

    /// Queues a call. Fails only if the worker is gone.
    pub fn submit(&self, seq: u64, call: Call) -> Result<(), QliteError> {
        self.jobs
            .send(Job { seq, call })
            .map_err(|_| QliteError::Worker("worker is no longer running".to_string()))
    }

    /// Stops accepting calls and waits for the resource to close.
    ///
    /// The permit has been released by the time this returns, whatever the
    /// outcome.
    pub async fn shutdown(self) -> Result<(), QliteError> {
        let Worker { jobs, handle } = self;
        drop(jobs);
        match handle.instrument(tracing::debug_span!("worker_shutdown")).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(QliteError::Engine { source }),
            Err(join) => Err(QliteError::Worker(format!("worker terminated abnormally: {join}"))),
        }
    }
}

fn run<R: Resource>(
    mut resource: R,
    mut queue: mpsc::UnboundedReceiver<Job>,
    outbox: Outbox,
    permit: Permit,
) -> Result<(), BoxError> {
    debug!("worker started");
    let mut cursor: Option<R::Cursor> = None;

    while let Some(Job { seq, call }) = queue.blocking_recv() {
        let op = call.name();
        let outcome = dispatch(&mut resource, &mut cursor, call);
        debug!(seq, op, ok = outcome.is_ok(), "call finished");
        if !outbox.deliver(seq, outcome) {
            debug!(seq, "session hung up; dropping remaining calls");
            break;
        }
    }

    let closed = resource.close();
    if let Err(e) = &closed {
        warn!(error = %e, "resource close failed");
    }
    permit.release();
    debug!("worker stopped");
    closed
}

fn dispatch<R: Resource>(resource: &mut R, cursor: &mut Option<R::Cursor>, call: Call) -> Outcome {
    match call {
        Call::Execute { sql, params } => replace_cursor(cursor, resource.execute(&sql, &params)),
        Call::ExecuteMany { sql, param_sets } => {
            replace_cursor(cursor, resource.execute_many(&sql, &param_sets))
        }
        Call::FetchOne => {
            let c = cursor.as_mut().ok_or(QliteError::NoActiveCursor)?;
            resource.fetch_one(c).map(Reply::Row).map_err(QliteError::engine)
        }
        Call::FetchAll => {
            let c = cursor.as_mut().ok_or(QliteError::NoActiveCursor)?;
            resource.fetch_all(c).map(Reply::Rows).map_err(QliteError::engine)
        }
        Call::Commit => resource
            .commit()
            .map(|()| Reply::Committed)
            .map_err(QliteError::engine),
    }
}

/// A failed execute leaves no active cursor behind.
fn replace_cursor<C>(cursor: &mut Option<C>, result: Result<C, BoxError>) -> Outcome {
    match result {
        Ok(c) => {
            *cursor = Some(c);
            Ok(Reply::Executed)
        }
        Err(source) => {
            *cursor = None;
            Err(QliteError::Engine { source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AdmissionGate;
    use crate::mailbox::mailbox;
    use qlite_test_utils::{MockEngineError, MockFactory};
    use qlite_core::ResourceFactory;

    #[tokio::test]
    async fn runs_calls_in_submission_order() {
        let factory = MockFactory::new().with_rows("SELECT", vec![Row(vec![Value::Integer(1)])]);
        let resource = factory.open("t.db").unwrap();
        let gate = AdmissionGate::new();
        let (outbox, mut mb) = mailbox();
        let worker = Worker::spawn(resource, outbox, gate.acquire().await, 1);

        worker.submit(1, Call::Execute { sql: "SELECT 1".into(), params: vec![] }).unwrap();
        assert_eq!(mb.take(1, None).await.unwrap(), Reply::Executed);
        worker.submit(2, Call::FetchAll).unwrap();
        assert_eq!(
            mb.take(2, None).await.unwrap(),
            Reply::Rows(vec![Row(vec![Value::Integer(1)])])
        );

        worker.shutdown().await.unwrap();
        assert_eq!(gate.available(), 1);
        assert_eq!(factory.log().statements(), vec!["SELECT 1"]);
    }

    #[tokio::test]
    async fn failed_execute_clears_cursor() {
        let factory = MockFactory::new().fail_on("BROKEN", "syntax error");
        let resource = factory.open("t.db").unwrap();
        let gate = AdmissionGate::new();
        let (outbox, mut mb) = mailbox();
        let worker = Worker::spawn(resource, outbox, gate.acquire().await, 1);

        worker.submit(1, Call::Execute { sql: "SELECT 1".into(), params: vec![] }).unwrap();
        mb.take(1, None).await.unwrap();
        worker.submit(2, Call::Execute { sql: "BROKEN".into(), params: vec![] }).unwrap();
        let err = mb.take(2, None).await.unwrap_err();
        assert_eq!(
            err.engine_source::<MockEngineError>(),
            Some(&MockEngineError("syntax error".into()))
        );
        worker.submit(3, Call::FetchOne).unwrap();
        assert!(matches!(mb.take(3, None).await, Err(QliteError::NoActiveCursor)));

        worker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn close_failure_still_releases_permit() {
        let factory = MockFactory::new().fail_close("locked");
        let resource = factory.open("t.db").unwrap();
        let gate = AdmissionGate::new();
        let (outbox, _mb) = mailbox();
        let worker = Worker::spawn(resource, outbox, gate.acquire().await, 1);

        let err = worker.shutdown().await.unwrap_err();
        assert!(err.engine_source::<MockEngineError>().is_some());
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn panic_in_resource_releases_permit_and_wakes_caller() {
        let factory = MockFactory::new().panic_on("PANIC");
        let resource = factory.open("t.db").unwrap();
        let gate = AdmissionGate::new();
        let (outbox, mut mb) = mailbox();
        let worker = Worker::spawn(resource, outbox, gate.acquire().await, 1);

        worker.submit(1, Call::Execute { sql: "PANIC".into(), params: vec![] }).unwrap();
        assert!(matches!(mb.take(1, None).await, Err(QliteError::Worker(_))));
        assert!(matches!(worker.shutdown().await, Err(QliteError::Worker(_))));
        assert_eq!(gate.available(), 1);
    }
}
