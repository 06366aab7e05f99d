// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the underlying synchronous database engine.
//!
//! Implementations are strictly single-threaded and blocking; the session
//! layer guarantees every call happens on one worker at a time.

pub mod resource;

pub use resource::{Resource, ResourceFactory};
