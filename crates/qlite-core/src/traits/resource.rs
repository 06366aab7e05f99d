// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource and factory traits for embedded database engines.

use crate::error::BoxError;
use crate::types::{Row, Value};

/// An opened, synchronous database handle.
///
/// Every method blocks the calling thread. A `Resource` is moved onto a
/// dedicated worker when a session opens and is only ever touched from there,
/// so implementations need `Send` but not `Sync`.
pub trait Resource: Send + 'static {
    /// Engine-side state of the last executed statement.
    type Cursor: Send + 'static;

    /// Runs one statement with positional parameters.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Self::Cursor, BoxError>;

    /// Runs one statement once per parameter set.
    fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<Value>],
    ) -> Result<Self::Cursor, BoxError>;

    /// Returns the next row of `cursor`, or `None` when exhausted.
    fn fetch_one(&mut self, cursor: &mut Self::Cursor) -> Result<Option<Row>, BoxError>;

    /// Returns all remaining rows of `cursor`.
    fn fetch_all(&mut self, cursor: &mut Self::Cursor) -> Result<Vec<Row>, BoxError>;

    /// Commits the pending transaction, if any.
    fn commit(&mut self) -> Result<(), BoxError>;

    /// Releases the handle.
    fn close(self) -> Result<(), BoxError>;
}

/// Opens resources given a location identifier (a file path for SQLite).
pub trait ResourceFactory: Send + Sync + 'static {
    type Resource: Resource;

    /// Opens the resource. Called once per session, on a blocking thread.
    fn open(&self, location: &str) -> Result<Self::Resource, BoxError>;
}
