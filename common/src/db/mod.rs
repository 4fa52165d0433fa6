//! SQLite access for the employee database.
//!
//! Generated sql runs verbatim: nothing here rewrites, filters or parameterizes
//! what the model produced.

use crate::error::{AskDbError, Result};
use crate::schema::create_tables_sql;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OpenFlags};
use serde_json::{Number, Value};
use std::path::Path;

/// rows returned by one query, in statement order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// rows as a json array of arrays, the shape the response model is shown
    pub fn rows_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// open an existing database file; a missing file is a configuration error
    /// rather than a fresh empty database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AskDbError::Config(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        tracing::info!("opened database {}", path.display());
        Ok(Self { conn })
    }

    /// create a database file holding the empty employee schema
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(&create_tables_sql())?;

        tracing::info!("created database schema in {}", path.display());
        Ok(Self { conn })
    }

    /// in-memory database with the employee schema applied
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&create_tables_sql())?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// run `sql` as-is and collect every row. exactly one statement is
    /// accepted; trailing whitespace, comments and `;` are fine.
    #[tracing::instrument(skip(self))]
    pub fn execute(&self, sql: &str) -> Result<QueryResultSet> {
        let mut batch = Batch::new(&self.conn, sql);
        let Some(mut stmt) = batch.next()? else {
            return Err(AskDbError::QueryExecution(
                "model returned an empty sql query".to_string(),
            ));
        };
        if batch.next()?.is_some() {
            return Err(AskDbError::QueryExecution(
                "You can only execute one statement at a time".to_string(),
            ));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(to_json(row.get_ref(idx)?));
            }
            rows.push(values);
        }

        tracing::debug!(rows = rows.len(), columns = width, "query executed");
        Ok(QueryResultSet { columns, rows })
    }

    /// user tables, sorted by name
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}
