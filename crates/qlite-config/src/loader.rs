// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./qlite.toml` > `~/.config/qlite/qlite.toml` > `/etc/qlite/qlite.toml`
//! with environment variable overrides via `QLITE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::QliteConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/qlite/qlite.toml";
pub(crate) const LOCAL_CONFIG: &str = "qlite.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/qlite/qlite.toml`
/// 3. `~/.config/qlite/qlite.toml`
/// 4. `./qlite.toml`
/// 5. `QLITE_*` environment variables
pub fn load_config() -> Result<QliteConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<QliteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QliteConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<QliteConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QliteConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(QliteConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("qlite/qlite.toml"))
}

/// Environment provider mapping `QLITE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after the section name becomes a dot, so
/// `QLITE_DATABASE_BUSY_TIMEOUT_MS` maps to `database.busy_timeout_ms`.
fn env_provider() -> Env {
    Env::prefixed("QLITE_").map(|key| {
        key.as_str()
            .replacen("database_", "database.", 1)
            .replacen("session_", "session.", 1)
            .replacen("logging_", "logging.", 1)
            .into()
    })
}
