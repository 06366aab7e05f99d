// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock resource for deterministic session tests.
//!
//! All state is shared through the factory, so a test keeps a clone of the
//! factory and inspects the log after the resource has moved onto a worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

use qlite_core::{BoxError, Resource, ResourceFactory, Row, Value};

/// The engine error raised by [`MockResource`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("mock engine error: {0}")]
pub struct MockEngineError(pub String);

/// One observed call against a mock resource.
#[derive(Debug, Clone, PartialEq)]
pub enum CallRecord {
    Open(String),
    Execute(String, Vec<Value>),
    ExecuteMany(String, usize),
    FetchOne,
    FetchAll,
    Commit,
    Close,
}

/// Ordered record of every call made through one factory.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<CallRecord>>>,
}

impl CallLog {
    fn push(&self, record: CallRecord) {
        trace!(?record, "mock call");
        self.calls.lock().unwrap().push(record);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    /// SQL text of every execute and executemany, in order.
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CallRecord::Execute(sql, _) | CallRecord::ExecuteMany(sql, _) => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&CallRecord) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

#[derive(Debug, Default)]
struct Script {
    rows: Vec<(String, Vec<Row>)>,
    failures: Vec<(String, String)>,
    panics: Vec<String>,
    open_error: Option<String>,
    commit_error: Option<String>,
    close_error: Option<String>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Shared {
    script: Mutex<Script>,
    log: CallLog,
    opens: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// Factory for [`MockResource`]s. Clones share script, log, and counters.
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    shared: Arc<Shared>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, f: impl FnOnce(&mut Script)) -> Self {
        f(&mut self.shared.script.lock().unwrap());
        self
    }

    /// Queries whose SQL starts with `prefix` return `rows`.
    pub fn with_rows(self, prefix: &str, rows: Vec<Row>) -> Self {
        let prefix = prefix.to_string();
        self.script(|s| s.rows.push((prefix, rows)))
    }

    /// Statements containing `fragment` fail with `MockEngineError(message)`.
    pub fn fail_on(self, fragment: &str, message: &str) -> Self {
        let entry = (fragment.to_string(), message.to_string());
        self.script(|s| s.failures.push(entry))
    }

    /// Statements containing `fragment` panic on the worker.
    pub fn panic_on(self, fragment: &str) -> Self {
        let fragment = fragment.to_string();
        self.script(|s| s.panics.push(fragment))
    }

    pub fn fail_open(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.open_error = Some(message))
    }

    pub fn fail_commit(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.commit_error = Some(message))
    }

    pub fn fail_close(self, message: &str) -> Self {
        let message = message.to_string();
        self.script(|s| s.close_error = Some(message))
    }

    /// Every call blocks its thread for `delay` before doing anything.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.script(|s| s.delay = Some(delay))
    }

    pub fn log(&self) -> CallLog {
        self.shared.log.clone()
    }

    /// Successful opens so far.
    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Resources currently open.
    pub fn live(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open resources observed.
    pub fn max_live(&self) -> usize {
        self.shared.max_live.load(Ordering::SeqCst)
    }
}

impl ResourceFactory for MockFactory {
    type Resource = MockResource;

    fn open(&self, location: &str) -> Result<MockResource, BoxError> {
        let delay = self.shared.script.lock().unwrap().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.shared.log.push(CallRecord::Open(location.to_string()));
        if let Some(message) = &self.shared.script.lock().unwrap().open_error {
            return Err(Box::new(MockEngineError(message.clone())));
        }
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        let live = self.shared.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(MockResource {
            shared: Arc::clone(&self.shared),
            closed: false,
        })
    }
}

/// Cursor over scripted rows.
#[derive(Debug, Default)]
pub struct MockCursor {
    rows: VecDeque<Row>,
}

/// A resource that answers from the factory's script.
#[derive(Debug)]
pub struct MockResource {
    shared: Arc<Shared>,
    closed: bool,
}

impl MockResource {
    fn pause(&self) {
        let delay = self.shared.script.lock().unwrap().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }

    fn run(&self, sql: &str) -> Result<MockCursor, BoxError> {
        let script = self.shared.script.lock().unwrap();
        if script.panics.iter().any(|f| sql.contains(f.as_str())) {
            drop(script);
            panic!("mock resource panicked on `{sql}`");
        }
        if let Some((_, message)) = script.failures.iter().find(|(f, _)| sql.contains(f.as_str())) {
            return Err(Box::new(MockEngineError(message.clone())));
        }
        let rows: VecDeque<Row> = script
            .rows
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, rows)| rows.iter().cloned().collect())
            .unwrap_or_default();
        Ok(MockCursor { rows })
    }
}

impl Resource for MockResource {
    type Cursor = MockCursor;

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<MockCursor, BoxError> {
        self.pause();
        self.shared
            .log
            .push(CallRecord::Execute(sql.to_string(), params.to_vec()));
        self.run(sql)
    }

    fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<Value>],
    ) -> Result<MockCursor, BoxError> {
        self.pause();
        self.shared
            .log
            .push(CallRecord::ExecuteMany(sql.to_string(), param_sets.len()));
        self.run(sql).map(|_| MockCursor::default())
    }

    fn fetch_one(&mut self, cursor: &mut MockCursor) -> Result<Option<Row>, BoxError> {
        self.pause();
        self.shared.log.push(CallRecord::FetchOne);
        Ok(cursor.rows.pop_front())
    }

    fn fetch_all(&mut self, cursor: &mut MockCursor) -> Result<Vec<Row>, BoxError> {
        self.pause();
        self.shared.log.push(CallRecord::FetchAll);
        Ok(cursor.rows.drain(..).collect())
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.pause();
        self.shared.log.push(CallRecord::Commit);
        match &self.shared.script.lock().unwrap().commit_error {
            Some(message) => Err(Box::new(MockEngineError(message.clone()))),
            None => Ok(()),
        }
    }

    fn close(mut self) -> Result<(), BoxError> {
        self.shared.log.push(CallRecord::Close);
        self.closed = true;
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
        match &self.shared.script.lock().unwrap().close_error {
            Some(message) => Err(Box::new(MockEngineError(message.clone()))),
            None => Ok(()),
        }
    }
}

impl Drop for MockResource {
    fn drop(&mut self) {
        // Dropped without close: a panic on the worker or an abandoned open.
        if !self.closed {
            self.shared.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
