// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-permit admission gate.
//!
//! Backed by a one-permit tokio [`Semaphore`], which queues waiters in FIFO
//! order. The permit is an owned RAII value: it returns to the gate when
//! dropped and cannot be returned twice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use qlite_core::QliteError;

/// Capacity-1 gate guarding the one live connection to a database.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
}

/// The connection token. Dropping it releases the gate.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
}

impl AdmissionGate {
    /// Creates a gate holding its single permit.
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Waits until the permit is free and takes it.
    pub async fn acquire(&self) -> Permit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("admission gate semaphore is never closed");
        debug!("admission permit acquired");
        Permit::new(permit)
    }

    /// Like [`acquire`](Self::acquire) but gives up after `deadline`.
    ///
    /// A waiter that times out leaves the queue without taking the permit.
    pub async fn acquire_timeout(&self, deadline: Duration) -> Result<Permit, QliteError> {
        tokio::time::timeout(deadline, self.acquire())
            .await
            .map_err(|_| {
                debug!(?deadline, "admission permit wait timed out");
                QliteError::Timeout { duration: deadline }
            })
    }

    /// Takes the permit only if it is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(Permit::new)
    }

    /// Number of permits currently in the gate: 1 when idle, 0 while held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Permit {
    fn new(permit: OwnedSemaphorePermit) -> Self {
        Self {
            _permit: permit,
            acquired_at: Instant::now(),
        }
    }

    /// How long this permit has been held.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Returns the permit to its gate.
    pub fn release(self) {
        debug!(held_for = ?self.held_for(), "admission permit released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gate_starts_with_one_permit() {
        let gate = AdmissionGate::new();
        assert_eq!(gate.available(), 1);

        let permit = gate.acquire().await;
        assert_eq!(gate.available(), 0);
        assert!(gate.try_acquire().is_none());

        permit.release();
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn dropping_permit_releases_it() {
        let gate = AdmissionGate::new();
        {
            let _permit = gate.try_acquire().expect("gate is idle");
            assert_eq!(gate.available(), 0);
        }
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn second_acquire_waits_for_release() {
        let gate = AdmissionGate::new();
        let first = gate.acquire().await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        first.release();
        let second = waiter.await.unwrap();
        assert_eq!(gate.available(), 0);
        drop(second);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_acquire_leaves_gate_untouched() {
        let gate = AdmissionGate::new();
        let held = gate.acquire().await;

        let err = gate
            .acquire_timeout(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(gate.available(), 0);

        drop(held);
        assert_eq!(gate.available(), 1);
        let again = gate.acquire_timeout(Duration::from_millis(50)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn waiters_are_admitted_in_arrival_order() {
        let gate = AdmissionGate::new();
        let held = gate.acquire().await;
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let permit = gate.acquire().await;
                order.lock().unwrap().push(i);
                permit.release();
            }));
            // Let each waiter enqueue before spawning the next.
            tokio::task::yield_now().await;
        }

        held.release();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
