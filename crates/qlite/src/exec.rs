// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `qlite exec` command implementation.

use tracing::debug;

use qlite_core::{QliteError, ResourceFactory, Row};
use qlite_storage::Database;

use crate::output;

/// Runs `statements` in one session and prints the last non-empty result set.
pub async fn run_exec<F: ResourceFactory>(
    db: &Database<F>,
    statements: &[String],
) -> Result<(), QliteError> {
    let rows = execute_statements(db, statements).await?;
    output::write_rows(&mut std::io::stdout().lock(), &rows)
        .map_err(|e| QliteError::Worker(format!("failed to write output: {e}")))
}

/// Executes each statement in order, commits, and closes.
///
/// Returns the rows of the last statement that produced any. Nothing is
/// committed if a statement fails.
pub async fn execute_statements<F: ResourceFactory>(
    db: &Database<F>,
    statements: &[String],
) -> Result<Vec<Row>, QliteError> {
    let statements = statements.to_vec();
    db.with_session(move |session| {
        Box::pin(async move {
            let mut last = Vec::new();
            for sql in &statements {
                debug!(session = session.id(), sql = %sql, "exec");
                let rows = session.execute(sql, &[]).await?.fetchall().await?;
                if !rows.is_empty() {
                    last = rows;
                }
            }
            session.commit().await?;
            Ok(last)
        })
    })
    .await
}
