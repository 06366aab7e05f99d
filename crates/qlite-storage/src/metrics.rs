// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and recording helpers.
//!
//! Uses the metrics-rs facade; nothing is recorded unless the embedding
//! application installs a recorder.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};

use crate::mailbox::Outcome;

/// Register all qlite metric descriptions. Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!("qlite_sessions_opened_total", "Sessions admitted and opened");
    describe_counter!("qlite_sessions_closed_total", "Sessions closed or dropped");
    describe_gauge!("qlite_sessions_open", "Sessions currently holding the permit");
    describe_histogram!(
        "qlite_gate_wait_seconds",
        "Time spent waiting for the admission permit"
    );
    describe_histogram!("qlite_session_seconds", "How long sessions stayed open");
    describe_counter!("qlite_calls_total", "Blocking calls by operation and outcome");
    describe_histogram!(
        "qlite_call_seconds",
        "Round-trip latency of a blocking call, submit to delivery"
    );
}

pub fn record_session_opened() {
    metrics::counter!("qlite_sessions_opened_total").increment(1);
    metrics::gauge!("qlite_sessions_open").increment(1.0);
}

pub fn record_session_closed(open_for: Duration) {
    metrics::counter!("qlite_sessions_closed_total").increment(1);
    metrics::gauge!("qlite_sessions_open").decrement(1.0);
    metrics::histogram!("qlite_session_seconds").record(open_for.as_secs_f64());
}

pub fn record_gate_wait(waited: Duration) {
    metrics::histogram!("qlite_gate_wait_seconds").record(waited.as_secs_f64());
}

pub fn record_call(op: &'static str, outcome: &Outcome, elapsed: Duration) {
    let result = match outcome {
        Ok(_) => "ok",
        Err(e) if e.is_timeout() => "timeout",
        Err(_) => "error",
    };
    metrics::counter!("qlite_calls_total", "op" => op, "result" => result).increment(1);
    metrics::histogram!("qlite_call_seconds", "op" => op).record(elapsed.as_secs_f64());
}
