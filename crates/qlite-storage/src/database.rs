// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource manager: one database target, one admission gate.
//!
//! A [`Database`] is cheap to clone and shared by every task that talks to
//! the same file. Each [`open`](Database::open) takes the single permit, opens
//! the resource on the blocking pool, and binds it to a new [`Session`].
//! Contention suspends the caller; it never fails unless a deadline is set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use qlite_config::QliteConfig;
use qlite_core::{QliteError, ResourceFactory};

use crate::gate::{AdmissionGate, Permit};
use crate::metrics;
use crate::session::Session;
use crate::sqlite::SqliteFactory;

/// A freshly opened resource and the permit admitting it. Fields drop in
/// declaration order: resource first, then permit.
struct Opened<R> {
    resource: R,
    permit: Permit,
}

/// Deadlines for the two suspension points. `None` waits indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub acquire_timeout: Option<Duration>,
    pub call_timeout: Option<Duration>,
}

/// Shared entry point for sessions on one database location.
pub struct Database<F: ResourceFactory> {
    location: Arc<str>,
    factory: Arc<F>,
    gate: AdmissionGate,
    options: SessionOptions,
    next_id: Arc<AtomicU64>,
}

impl<F: ResourceFactory> Clone for Database<F> {
    fn clone(&self) -> Self {
        Self {
            location: Arc::clone(&self.location),
            factory: Arc::clone(&self.factory),
            gate: self.gate.clone(),
            options: self.options,
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<F: ResourceFactory> std::fmt::Debug for Database<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.location)
            .field("options", &self.options)
            .field("permits", &self.gate.available())
            .finish()
    }
}

impl Database<SqliteFactory> {
    /// SQLite database configured from the `[database]` and `[session]` sections.
    pub fn from_config(config: &QliteConfig) -> Self {
        Database::with_options(
            SqliteFactory::from_config(&config.database),
            config.database.path.clone(),
            SessionOptions {
                acquire_timeout: config.session.acquire_timeout(),
                call_timeout: config.session.call_timeout(),
            },
        )
    }
}

impl<F: ResourceFactory> Database<F> {
    /// Creates a manager for `location` with no deadlines.
    pub fn new(factory: F, location: impl Into<String>) -> Self {
        Self::with_options(factory, location, SessionOptions::default())
    }

    pub fn with_options(factory: F, location: impl Into<String>, options: SessionOptions) -> Self {
        let location: String = location.into();
        Self {
            location: location.into(),
            factory: Arc::new(factory),
            gate: AdmissionGate::new(),
            options,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Waits for the permit, opens the resource, and returns a session.
    ///
    /// Fails with [`QliteError::Open`] if the factory fails (the permit goes
    /// back to the gate) or [`QliteError::Timeout`] if an acquire deadline is
    /// configured and expires.
    ///
    /// Dropping the future while the resource is being opened does not free
    /// the gate early: the permit stays held until that open has finished and
    /// its resource has been dropped.
    pub async fn open(&self) -> Result<Session, QliteError> {
        let started = Instant::now();
        let permit = match self.options.acquire_timeout {
            Some(deadline) => self.gate.acquire_timeout(deadline).await?,
            None => self.gate.acquire().await,
        };
        metrics::record_gate_wait(started.elapsed());
        self.open_with(permit).await
    }

    /// Opens a session only if the permit is free right now.
    pub async fn try_open(&self) -> Option<Result<Session, QliteError>> {
        let permit = self.gate.try_acquire()?;
        Some(self.open_with(permit).await)
    }

    /// Scoped acquisition: opens a session, runs `f` with it, and always
    /// closes it afterwards.
    ///
    /// An error from `f` takes precedence over a close error.
    ///
    /// ```no_run
    /// # async fn demo(db: qlite_storage::Database<qlite_storage::SqliteFactory>)
    /// #     -> Result<(), qlite_core::QliteError> {
    /// let rows = db
    ///     .with_session(|s| {
    ///         Box::pin(async move {
    ///             s.execute("SELECT 1", &[]).await?;
    ///             s.fetchall().await
    ///         })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_session<T, Fun>(&self, f: Fun) -> Result<T, QliteError>
    where
        Fun: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, QliteError>>,
    {
        let mut session = self.open().await?;
        let result = f(&mut session).await;
        let closed = session.close().await;
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "close failed after scoped work failed");
                Err(e)
            }
        }
    }

    async fn open_with(&self, permit: Permit) -> Result<Session, QliteError> {
        let factory = Arc::clone(&self.factory);
        let location = self.location.to_string();
        // The permit rides along with the blocking open. If this future is
        // dropped mid-open, the permit is only released once the orphaned
        // resource has been dropped.
        let opened = tokio::task::spawn_blocking({
            let location = location.clone();
            move || match factory.open(&location) {
                Ok(resource) => Ok(Opened { resource, permit }),
                Err(source) => {
                    permit.release();
                    Err(source)
                }
            }
        })
        .await;

        let Opened { resource, permit } = match opened {
            Ok(Ok(opened)) => opened,
            Ok(Err(source)) => {
                debug!(location = %location, error = %source, "open failed; permit returned");
                return Err(QliteError::Open { location, source });
            }
            Err(join) => {
                return Err(QliteError::Open {
                    location,
                    source: Box::new(join),
                });
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(Session::start(
            id,
            location,
            resource,
            permit,
            self.options.call_timeout,
        ))
    }
}
