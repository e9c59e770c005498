//! Driver boundary consumed by the connection core
//!
//! The connection core is purely a client of these traits. [`SqlxDriver`]
//! implements them over sqlx; tests plug in a recording driver.
//!
//! [`SqlxDriver`]: crate::database::adapters::SqlxDriver

use crate::database::config::ConnectionConfig;
use crate::database::platforms::Platform;
use crate::database::schema::{SchemaManager, SqlSchemaManager};
use crate::database::types::SqlValue;
use crate::error::Result;
use indexmap::IndexMap;
use std::sync::Arc;

/// One result row, keyed by column name in select order
pub type Row = IndexMap<String, SqlValue>;

/// Handle for an executed statement
///
/// Rows are pulled sequentially with [`Statement::fetch`]. A closed cursor
/// yields no further rows.
pub trait Statement: Send {
    /// Next row, or `None` when exhausted or closed
    fn fetch(&mut self) -> Option<Row>;

    /// All remaining rows
    fn fetch_all(&mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch() {
            rows.push(row);
        }
        rows
    }

    /// Rows in the result set, or rows affected for mutating statements
    fn row_count(&self) -> u64;

    fn column_count(&self) -> usize;

    /// True when the statement produced a result set (SELECT-class)
    fn is_result_set(&self) -> bool;

    /// Move the cursor to an absolute row position
    fn seek(&mut self, position: usize) -> bool;

    fn close_cursor(&mut self);

    fn is_open(&self) -> bool;
}

impl std::fmt::Debug for dyn Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("row_count", &self.row_count())
            .field("column_count", &self.column_count())
            .field("is_open", &self.is_open())
            .finish()
    }
}

/// An open connection to a database server
pub trait DriverConnection: Send {
    /// Execute raw SQL
    fn query(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Execute SQL with bound parameters in platform placeholder syntax
    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn Statement>>;

    /// Quote a string literal, including the surrounding quotes
    fn quote(&self, value: &str) -> String {
        self.platform().quote_string_literal(value)
    }

    /// Numeric code of the last failed operation, 0 if none
    fn error_code(&self) -> i64;

    /// Message of the last failed operation, empty if none
    fn error_message(&self) -> String;

    fn last_insert_id(&mut self) -> i64;

    fn is_connected(&self) -> bool;

    fn close(&mut self);

    fn platform(&self) -> Arc<dyn Platform>;

    fn schema_manager(&self) -> Arc<dyn SchemaManager> {
        Arc::new(SqlSchemaManager::new(self.platform()))
    }
}

/// Factory for driver connections
pub trait Driver: Send + Sync {
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DriverConnection>>;
}

/// Whether a statement produces a result set, judged by its leading keyword
pub fn returns_rows(sql: &str) -> bool {
    let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let keyword: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "SELECT" | "SHOW" | "PRAGMA" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH" | "VALUES"
    )
}

/// Cursor over rows already fetched from the server
#[derive(Debug, Clone, Default)]
pub struct BufferedStatement {
    columns: Vec<String>,
    rows: Vec<Row>,
    position: usize,
    affected: u64,
    result_set: bool,
    open: bool,
}

impl BufferedStatement {
    /// Statement carrying a result set
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            rows,
            position: 0,
            affected: 0,
            result_set: true,
            open: true,
        }
    }

    /// Statement for a mutating command
    pub fn with_affected(affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            position: 0,
            affected,
            result_set: false,
            open: true,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Statement for BufferedStatement {
    fn fetch(&mut self) -> Option<Row> {
        if !self.open {
            return None;
        }
        let row = self.rows.get(self.position).cloned()?;
        self.position += 1;
        Some(row)
    }

    fn row_count(&self) -> u64 {
        if self.result_set {
            self.rows.len() as u64
        } else {
            self.affected
        }
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn is_result_set(&self) -> bool {
        self.result_set
    }

    fn seek(&mut self, position: usize) -> bool {
        if !self.open || position >= self.rows.len() {
            return false;
        }
        self.position = position;
        true
    }

    fn close_cursor(&mut self) {
        self.open = false;
        self.rows.clear();
        self.position = 0;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
