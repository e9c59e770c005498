//! INSERT query object

use crate::database::connection::DatabaseConnection;
use crate::database::platforms::Platform;
use crate::database::quoting::Quoter;
use crate::database::types::SqlValue;
use crate::error::{codes, Error, Result};
use std::fmt;
use std::sync::Arc;

/// INSERT builder supporting single and multi-row VALUES
pub struct InsertQuery<'a> {
    conn: &'a mut DatabaseConnection,
    platform: Arc<dyn Platform>,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    no_quote_fields: Vec<String>,
    allow_null: bool,
}

impl<'a> InsertQuery<'a> {
    pub(crate) fn new(conn: &'a mut DatabaseConnection, platform: Arc<dyn Platform>) -> Self {
        Self {
            conn,
            platform,
            table: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            no_quote_fields: Vec::new(),
            allow_null: true,
        }
    }

    #[allow(clippy::should_implement_trait, clippy::wrong_self_convention)]
    pub fn into(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the column list and a single row from field/value pairs
    pub fn values<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let (columns, row): (Vec<String>, Vec<SqlValue>) = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        self.columns = columns;
        self.rows = vec![row];
        self
    }

    /// Set the column list for rows added with [`add_row`](Self::add_row)
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append one row; its length must match the column list
    pub fn add_row<I, V>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let row: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(Error::invalid_argument(
                format!(
                    "Row has {} values but {} columns were given",
                    row.len(),
                    self.columns.len()
                ),
                codes::MISMATCHED_VALUES,
            ));
        }
        self.rows.push(row);
        Ok(self)
    }

    /// Columns whose values are inserted verbatim as SQL
    pub fn no_quote_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_quote_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Render NULL values as `NULL` (default) or as empty strings
    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    pub fn get_sql(&self) -> Result<String> {
        if self.table.trim().is_empty() {
            return Err(Error::invalid_query(
                "No table given for INSERT",
                codes::MISSING_TABLE,
            ));
        }
        if self.columns.is_empty() || self.rows.is_empty() {
            return Err(Error::invalid_query(
                format!("No values given for INSERT into '{}'", self.table),
                codes::MISSING_VALUES,
            ));
        }

        let quoter = Quoter::new(self.platform.clone());
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let values: Vec<String> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| {
                        if self.no_quote_fields.iter().any(|f| f == column) {
                            value.to_literal().unwrap_or_else(|| "NULL".to_string())
                        } else {
                            quoter.quote(value, self.allow_null)
                        }
                    })
                    .collect();
                format!("({})", values.join(", "))
            })
            .collect();

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(", "),
            rows.join(", ")
        ))
    }

    /// Execute and return the number of inserted rows
    pub fn execute(self) -> Result<u64> {
        let sql = self.get_sql()?;
        let stmt = self.conn.query(&sql)?;
        Ok(stmt.row_count())
    }
}

impl fmt::Debug for InsertQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertQuery")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .finish()
    }
}
