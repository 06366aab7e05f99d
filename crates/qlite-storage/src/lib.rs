// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async access to a single-threaded, blocking SQLite connection.
//!
//! Many tasks share one [`Database`]. Each caller obtains a [`Session`] through
//! the [`AdmissionGate`], which hands out a single permit, so at most one
//! connection to the file is live at any time. Every data operation on a
//! session is shipped to that session's dedicated worker on tokio's blocking
//! pool and its outcome comes back through a one-slot mailbox.
//!
//! ```text
//! Database::open ──► AdmissionGate (1 permit) ──► ResourceFactory::open
//!                                                       │
//!                       Session ── Call ──► Worker (blocking pool, owns Resource)
//!                          ▲                     │
//!                          └──── Mailbox (cap 1) ◄┘
//! ```

pub mod database;
pub mod gate;
pub mod mailbox;
pub mod metrics;
pub mod session;
pub mod sqlite;
pub mod worker;

pub use database::{Database, SessionOptions};
pub use gate::{AdmissionGate, Permit};
pub use session::Session;
pub use sqlite::{SqliteCursor, SqliteFactory, SqliteResource};

pub use qlite_core::{params, QliteError, Row, SessionState, Value};
