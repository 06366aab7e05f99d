// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row printing shared by `exec` and `shell`.

use std::io::{self, Write};

use qlite_core::{Row, Value};

/// One row as pipe-separated text. NULL prints as an empty field and text
/// is unquoted.
pub fn format_row(row: &Row) -> String {
    row.values()
        .iter()
        .map(|value| match value {
            Value::Null => String::new(),
            Value::Text(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

pub fn write_rows(out: &mut impl Write, rows: &[Row]) -> io::Result<()> {
    for row in rows {
        writeln!(out, "{}", format_row(row))?;
    }
    Ok(())
}
