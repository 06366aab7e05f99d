// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-slot result handoff from a worker to its session.
//!
//! Every submission carries a sequence number. A caller that stops waiting
//! (deadline expiry or a dropped future) leaves its result behind; the next
//! wait discards anything older than the sequence it is waiting for, so a late
//! result is never handed to the wrong call.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use qlite_core::QliteError;

use crate::worker::Reply;

/// Tagged result of one blocking call: the reply, or the failure it raised.
pub type Outcome = Result<Reply, QliteError>;

/// A tagged result together with the sequence number of its call.
#[derive(Debug)]
pub struct Delivery {
    pub seq: u64,
    pub outcome: Outcome,
}

/// Worker side of the mailbox.
#[derive(Debug)]
pub struct Outbox {
    tx: mpsc::Sender<Delivery>,
}

/// Session side of the mailbox.
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::Receiver<Delivery>,
}

/// Creates a connected outbox/mailbox pair with room for one result.
pub fn mailbox() -> (Outbox, Mailbox) {
    let (tx, rx) = mpsc::channel(1);
    (Outbox { tx }, Mailbox { rx })
}

impl Outbox {
    /// Deposits a result, blocking the worker thread while the slot is full.
    ///
    /// Returns `false` once the session side has gone away.
    pub fn deliver(&self, seq: u64, outcome: Outcome) -> bool {
        self.tx.blocking_send(Delivery { seq, outcome }).is_ok()
    }
}

impl Mailbox {
    /// Waits for the result of call `seq`, optionally bounded by `deadline`.
    ///
    /// Cancel-safe: dropping the returned future consumes nothing that belongs
    /// to a later call.
    pub async fn take(&mut self, seq: u64, deadline: Option<Duration>) -> Outcome {
        match deadline {
            Some(duration) => tokio::time::timeout(duration, self.recv_matching(seq))
                .await
                .map_err(|_| QliteError::Timeout { duration })?,
            None => self.recv_matching(seq).await,
        }
    }

    async fn recv_matching(&mut self, seq: u64) -> Outcome {
        loop {
            match self.rx.recv().await {
                Some(delivery) if delivery.seq < seq => {
                    warn!(
                        stale = delivery.seq,
                        waiting_for = seq,
                        "discarding result of an abandoned call"
                    );
                }
                Some(delivery) => return delivery.outcome,
                None => {
                    return Err(QliteError::Worker(
                        "worker stopped before delivering a result".to_string(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_matching_result() {
        let (outbox, mut mailbox) = mailbox();
        std::thread::spawn(move || {
            assert!(outbox.deliver(1, Ok(Reply::Committed)));
        });
        let outcome = mailbox.take(1, None).await;
        assert!(matches!(outcome, Ok(Reply::Committed)));
    }

    #[tokio::test]
    async fn failure_is_delivered_as_a_value() {
        let (outbox, mut mailbox) = mailbox();
        std::thread::spawn(move || {
            outbox.deliver(1, Err(QliteError::engine(std::io::Error::other("boom"))));
        });
        let err = mailbox.take(1, None).await.unwrap_err();
        assert_eq!(
            err.engine_source::<std::io::Error>().map(|e| e.to_string()),
            Some("boom".to_string())
        );
    }

    #[tokio::test]
    async fn stale_results_are_skipped() {
        let (outbox, mut mailbox) = mailbox();
        std::thread::spawn(move || {
            outbox.deliver(1, Ok(Reply::Row(None)));
            outbox.deliver(2, Ok(Reply::Committed));
        });
        let outcome = mailbox.take(2, None).await;
        assert!(matches!(outcome, Ok(Reply::Committed)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_reports_timeout() {
        let (_outbox, mut mailbox) = mailbox();
        let err = mailbox
            .take(1, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn closed_outbox_reports_worker_error() {
        let (outbox, mut mailbox) = mailbox();
        drop(outbox);
        let err = mailbox.take(1, None).await.unwrap_err();
        assert!(matches!(err, QliteError::Worker(_)));
    }

    #[tokio::test]
    async fn deliver_fails_after_mailbox_dropped() {
        let (outbox, mailbox) = mailbox();
        drop(mailbox);
        let delivered = tokio::task::spawn_blocking(move || outbox.deliver(1, Ok(Reply::Committed)))
            .await
            .unwrap();
        assert!(!delivered);
    }
}
