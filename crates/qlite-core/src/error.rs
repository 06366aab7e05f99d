// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for qlite.

use thiserror::Error;

/// Boxed engine error as raised by a [`Resource`](crate::Resource).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across the session layer and its collaborators.
#[derive(Debug, Error)]
pub enum QliteError {
    /// The resource factory could not open the underlying resource.
    #[error("failed to open `{location}`: {source}")]
    Open { location: String, source: BoxError },

    /// The underlying engine failed while running an operation.
    ///
    /// `source` is the engine's own error value, passed through untouched.
    #[error("engine error: {source}")]
    Engine { source: BoxError },

    /// `fetchone`/`fetchall` was called before any successful execute.
    #[error("no active cursor: execute a statement before fetching rows")]
    NoActiveCursor,

    /// The session has already been closed.
    #[error("session is closed")]
    SessionClosed,

    /// A suspension point exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The worker stopped without delivering a result.
    #[error("worker error: {0}")]
    Worker(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),
}

impl QliteError {
    /// Wrap an engine failure.
    pub fn engine(source: impl Into<BoxError>) -> Self {
        QliteError::Engine {
            source: source.into(),
        }
    }

    /// Returns the engine error as its concrete type, if this is an engine
    /// failure raised with an `E`.
    pub fn engine_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            QliteError::Engine { source } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// True for [`QliteError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, QliteError::Timeout { .. })
    }
}
