// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite resource backed by `rusqlite`.
//!
//! Statements are run to completion at execute time and their rows buffered
//! in a [`SqliteCursor`]; rusqlite statements borrow the connection and cannot
//! be kept between calls. Transactions follow the DB-API convention: a DML
//! statement in autocommit mode implicitly begins a transaction, which stays
//! open until [`commit`](Resource::commit). Closing without committing rolls
//! it back.

use std::collections::VecDeque;
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::debug;

use qlite_config::model::DatabaseConfig;
use qlite_core::{BoxError, Resource, ResourceFactory, Row, Value};

/// Location that opens a private in-memory database.
pub const MEMORY: &str = ":memory:";

/// Opens SQLite connections with PRAGMA setup.
#[derive(Debug, Clone)]
pub struct SqliteFactory {
    busy_timeout: Duration,
    wal_mode: bool,
    foreign_keys: bool,
    flags: OpenFlags,
}

impl Default for SqliteFactory {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            wal_mode: true,
            foreign_keys: true,
            flags: OpenFlags::default(),
        }
    }
}

impl SqliteFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            busy_timeout: config.busy_timeout(),
            wal_mode: config.wal_mode,
            foreign_keys: config.foreign_keys,
            flags: OpenFlags::default(),
        }
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.wal_mode = enabled;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Open existing files only; missing databases fail instead of being created.
    pub fn must_exist(mut self) -> Self {
        self.flags.remove(OpenFlags::SQLITE_OPEN_CREATE);
        self
    }
}

impl ResourceFactory for SqliteFactory {
    type Resource = SqliteResource;

    fn open(&self, location: &str) -> Result<SqliteResource, BoxError> {
        let conn = if location == MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open_with_flags(location, self.flags)?
        };
        conn.busy_timeout(self.busy_timeout)?;
        if self.wal_mode && location != MEMORY {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        if self.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        debug!(location, wal = self.wal_mode, "sqlite connection opened");
        Ok(SqliteResource { conn })
    }
}

/// An open SQLite connection.
#[derive(Debug)]
pub struct SqliteResource {
    conn: Connection,
}

/// Buffered result of one execute.
#[derive(Debug, Default)]
pub struct SqliteCursor {
    columns: Vec<String>,
    rows: VecDeque<Row>,
    rows_affected: usize,
}

impl SqliteCursor {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    /// Rows not yet fetched.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl SqliteResource {
    /// Begins a transaction before DML when none is open. Only called once
    /// the statement has prepared, so a rejected statement never opens one.
    fn begin_implicit(&self, sql: &str) -> rusqlite::Result<()> {
        if self.conn.is_autocommit() && is_dml(sql) {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

impl Resource for SqliteResource {
    type Cursor = SqliteCursor;

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<SqliteCursor, BoxError> {
        let mut stmt = self.conn.prepare(sql)?;
        self.begin_implicit(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let bound = params_from_iter(params.iter().map(to_sql));

        if columns.is_empty() {
            let rows_affected = stmt.execute(bound)?;
            return Ok(SqliteCursor {
                columns,
                rows: VecDeque::new(),
                rows_affected,
            });
        }

        let width = columns.len();
        let rows = stmt
            .query_map(bound, |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i).map(from_sql))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(Row)
            })?
            .collect::<rusqlite::Result<VecDeque<_>>>()?;

        Ok(SqliteCursor {
            columns,
            rows,
            rows_affected: 0,
        })
    }

    fn execute_many(
        &mut self,
        sql: &str,
        param_sets: &[Vec<Value>],
    ) -> Result<SqliteCursor, BoxError> {
        let mut stmt = self.conn.prepare(sql)?;
        self.begin_implicit(sql)?;
        let mut rows_affected = 0;
        for params in param_sets {
            // Statements that produce rows fail here with ExecuteReturnedResults.
            rows_affected += stmt.execute(params_from_iter(params.iter().map(to_sql)))?;
        }
        Ok(SqliteCursor {
            columns: Vec::new(),
            rows: VecDeque::new(),
            rows_affected,
        })
    }

    fn fetch_one(&mut self, cursor: &mut SqliteCursor) -> Result<Option<Row>, BoxError> {
        Ok(cursor.rows.pop_front())
    }

    fn fetch_all(&mut self, cursor: &mut SqliteCursor) -> Result<Vec<Row>, BoxError> {
        Ok(cursor.rows.drain(..).collect())
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn close(self) -> Result<(), BoxError> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

fn is_dml(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    ["INSERT", "UPDATE", "DELETE", "REPLACE"]
        .iter()
        .any(|k| keyword.eq_ignore_ascii_case(k))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Integer(i),
        SqlValue::Real(r) => Value::Real(r),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Blob(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlite_core::params;
    use tempfile::tempdir;

    fn memory() -> SqliteResource {
        SqliteFactory::new().open(MEMORY).unwrap()
    }

    #[test]
    fn dml_detection() {
        assert!(is_dml("INSERT INTO t VALUES (1)"));
        assert!(is_dml("  update t set x = 1"));
        assert!(is_dml("REPLACE INTO t VALUES (1)"));
        assert!(!is_dml("SELECT * FROM t"));
        assert!(!is_dml("CREATE TABLE t(x)"));
        assert!(!is_dml(""));
    }

    #[test]
    fn select_rows_are_buffered_in_order() {
        let mut db = memory();
        db.execute("CREATE TABLE t(x, y)", &[]).unwrap();
        db.execute_many(
            "INSERT INTO t VALUES (?1, ?2)",
            &[params![1, "a"], params![2, None::<String>]],
        )
        .unwrap();

        let mut cursor = db.execute("SELECT x, y FROM t ORDER BY x", &[]).unwrap();
        assert_eq!(cursor.columns(), ["x", "y"]);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(
            db.fetch_one(&mut cursor).unwrap(),
            Some(Row(vec![Value::Integer(1), Value::Text("a".into())]))
        );
        assert_eq!(
            db.fetch_all(&mut cursor).unwrap(),
            vec![Row(vec![Value::Integer(2), Value::Null])]
        );
        assert_eq!(db.fetch_one(&mut cursor).unwrap(), None);
    }

    #[test]
    fn dml_opens_transaction_until_commit() {
        let mut db = memory();
        db.execute("CREATE TABLE t(x)", &[]).unwrap();
        assert!(db.conn.is_autocommit());

        let cursor = db.execute("INSERT INTO t VALUES (?1)", &params![5]).unwrap();
        assert_eq!(cursor.rows_affected(), 1);
        assert!(!db.conn.is_autocommit());

        db.commit().unwrap();
        assert!(db.conn.is_autocommit());
        // Nothing to commit is not an error.
        db.commit().unwrap();
    }

    #[test]
    fn uncommitted_changes_are_discarded_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");
        let path = path.to_str().unwrap();
        let factory = SqliteFactory::new();

        let mut db = factory.open(path).unwrap();
        db.execute("CREATE TABLE t(x)", &[]).unwrap();
        db.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
        db.commit().unwrap();
        db.execute("INSERT INTO t VALUES (2)", &[]).unwrap();
        db.close().unwrap();

        let mut db = factory.open(path).unwrap();
        let mut cursor = db.execute("SELECT x FROM t", &[]).unwrap();
        assert_eq!(
            db.fetch_all(&mut cursor).unwrap(),
            vec![Row(vec![Value::Integer(1)])]
        );
    }

    #[test]
    fn rejected_dml_leaves_autocommit_on() {
        let mut db = memory();
        db.execute("INSERT INTO missing VALUES (1)", &[]).unwrap_err();
        assert!(db.conn.is_autocommit());
        db.execute_many("UPDATE missing SET x = ?1", &[params![1]])
            .unwrap_err();
        assert!(db.conn.is_autocommit());
    }

    #[test]
    fn defaults_match_database_config_defaults() {
        let config = DatabaseConfig::default();
        let configured = SqliteFactory::from_config(&config);
        let default = SqliteFactory::new();
        assert_eq!(default.busy_timeout, configured.busy_timeout);
        assert_eq!(default.wal_mode, configured.wal_mode);
        assert_eq!(default.foreign_keys, configured.foreign_keys);
        assert!(default.wal_mode);
    }

    #[test]
    fn engine_errors_are_rusqlite_errors() {
        let mut db = memory();
        let err = db.execute("SELEC 1", &[]).unwrap_err();
        assert!(err.downcast_ref::<rusqlite::Error>().is_some());
    }

    #[test]
    fn execute_many_rejects_queries() {
        let mut db = memory();
        let err = db.execute_many("SELECT ?1", &[params![1]]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::ExecuteReturnedResults)
        ));
    }

    #[test]
    fn must_exist_refuses_to_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let result = SqliteFactory::new().must_exist().open(path.to_str().unwrap());
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn wal_mode_is_applied_to_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let mut db = SqliteFactory::new().open(path.to_str().unwrap()).unwrap();
        let mut cursor = db.execute("PRAGMA journal_mode", &[]).unwrap();
        assert_eq!(
            db.fetch_one(&mut cursor).unwrap(),
            Some(Row(vec![Value::Text("wal".into())]))
        );
    }
}
