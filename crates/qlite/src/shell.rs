// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `qlite shell` command implementation.
//!
//! Holds one session for the life of the REPL, so other qlite processes on
//! the same database wait until the shell exits. Each line is one statement;
//! dot-commands control the session.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use qlite_core::{QliteError, ResourceFactory, Row};
use qlite_storage::{Database, Session};

use crate::output;

/// One parsed line of shell input.
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Empty,
    Commit,
    Quit,
    Unknown(&'a str),
    Sql(&'a str),
}

pub fn parse_line(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => Line::Empty,
        ".commit" => Line::Commit,
        ".quit" | ".exit" => Line::Quit,
        cmd if cmd.starts_with('.') => Line::Unknown(cmd),
        sql => Line::Sql(sql),
    }
}

/// Runs one statement and returns whatever rows it produced.
pub async fn run_statement(session: &mut Session, sql: &str) -> Result<Vec<Row>, QliteError> {
    session.execute(sql, &[]).await?.fetchall().await
}

/// Runs the `qlite shell` interactive REPL.
pub async fn run_shell<F: ResourceFactory>(db: &Database<F>) -> Result<(), QliteError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| QliteError::Worker(format!("failed to initialize readline: {e}")))?;

    let mut session = db.open().await?;

    println!("{} {}", "qlite shell".bold().green(), db.location().dimmed());
    println!(
        "Type {} to commit, {} to exit.\n",
        ".commit".yellow(),
        ".quit".yellow()
    );

    let prompt = format!("{}> ", "qlite".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let parsed = parse_line(&line);
                if parsed == Line::Empty {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match parsed {
                    Line::Empty => {}
                    Line::Quit => break,
                    Line::Commit => match session.commit().await {
                        Ok(()) => println!("{}", "committed".dimmed()),
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                    Line::Unknown(cmd) => {
                        eprintln!("{}: unknown command {cmd}", "error".red());
                    }
                    Line::Sql(sql) => match run_statement(&mut session, sql).await {
                        Ok(rows) => {
                            let mut out = std::io::stdout().lock();
                            if let Err(e) = output::write_rows(&mut out, &rows) {
                                debug!(error = %e, "failed to write rows");
                            }
                        }
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    session.close().await
}
