// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for qlite.
//!
//! This crate provides the error taxonomy, the value and row types, and the
//! synchronous [`Resource`] / [`ResourceFactory`] traits that an embedded
//! database engine implements to be driven by the async session layer in
//! `qlite-storage`.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, QliteError};
pub use traits::{Resource, ResourceFactory};
pub use types::{Row, SessionState, Value};

/// Build a `Vec<Value>` of statement parameters.
///
/// ```
/// use qlite_core::{params, Value};
///
/// let p = params![1, "two", None::<i64>];
/// assert_eq!(p, vec![Value::Integer(1), Value::Text("two".into()), Value::Null]);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($param:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($param)),+]
    };
}
