// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for qlite.
//!
//! - [`MockFactory`] / [`MockResource`] - scriptable in-memory resource that
//!   records every call, injects failures, panics and delays, and tracks how
//!   many resources are open at once.

pub mod mock_resource;

pub use mock_resource::{CallLog, CallRecord, MockEngineError, MockFactory, MockResource};
