// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! qlite - exclusive async sessions over a SQLite file.
//!
//! This is the binary entry point.

mod exec;
mod output;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use qlite_config::QliteConfig;
use qlite_core::QliteError;
use qlite_storage::{Database, SqliteFactory};

/// qlite - exclusive async sessions over a SQLite file.
#[derive(Parser, Debug)]
#[command(name = "qlite", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Database file to open (overrides `database.path`).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run SQL statements in one session and print the last result set.
    Exec {
        /// Statements, executed in order.
        #[arg(required = true)]
        sql: Vec<String>,
    },
    /// Launch an interactive SQL shell holding one session.
    Shell,
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => qlite_config::load_and_validate_path(path),
        None => qlite_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            qlite_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    init_tracing(&config.logging.level);
    qlite_storage::metrics::register_metrics();

    let result = match cli.command {
        Some(Commands::Exec { sql }) => match open_database(&config) {
            Ok(db) => exec::run_exec(&db, &sql).await,
            Err(e) => Err(e),
        },
        Some(Commands::Shell) => match open_database(&config) {
            Ok(db) => shell::run_shell(&db).await,
            Err(e) => Err(e),
        },
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("qlite: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

/// Builds the database manager, creating the file's parent directory.
fn open_database(config: &QliteConfig) -> Result<Database<SqliteFactory>, QliteError> {
    let path = &config.database.path;
    if path != qlite_storage::sqlite::MEMORY {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| QliteError::Open {
                    location: path.clone(),
                    source: Box::new(e),
                })?;
            }
        }
    }
    Ok(Database::from_config(config))
}

fn print_config(config: &QliteConfig) -> Result<(), QliteError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| QliteError::Config(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise qlite crates log at `log_level` and
/// everything else at `warn`. Logs go to stderr so query output stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qlite={log_level},qlite_storage={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exec_with_global_overrides() {
        let cli = Cli::try_parse_from([
            "qlite",
            "exec",
            "--db",
            "t.db",
            "CREATE TABLE t(x)",
            "SELECT * FROM t",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some("t.db"));
        match cli.command {
            Some(Commands::Exec { sql }) => {
                assert_eq!(sql, vec!["CREATE TABLE t(x)", "SELECT * FROM t"]);
            }
            other => panic!("expected exec, got {other:?}"),
        }
    }

    #[test]
    fn exec_requires_a_statement() {
        assert!(Cli::try_parse_from(["qlite", "exec"]).is_err());
    }

    #[test]
    fn config_path_is_accepted_before_subcommand() {
        let cli = Cli::try_parse_from(["qlite", "--config", "/tmp/q.toml", "config"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/q.toml")));
        assert!(matches!(cli.command, Some(Commands::Config)));
    }

    #[test]
    fn open_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = QliteConfig::default();
        config.database.path = dir
            .path()
            .join("nested/deeper/q.db")
            .to_string_lossy()
            .into_owned();

        let db = open_database(&config).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        assert_eq!(db.location(), config.database.path);
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let config = QliteConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[database]"));
        assert!(rendered.contains("busy_timeout_ms = 5000"));
    }
}
