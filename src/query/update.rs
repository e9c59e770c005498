//! UPDATE query object

use super::expression::{Constraint, Expression, ExpressionBuilder};
use super::{collect_constraints, is_invalid_table_name, render_predicates};
use crate::database::connection::DatabaseConnection;
use crate::database::platforms::Platform;
use crate::database::quoting::Quoter;
use crate::database::types::SqlValue;
use crate::error::{codes, Error, Result};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Assignment {
    Value(SqlValue),
    Raw(String),
}

/// UPDATE builder
///
/// Without a `where_()` call the statement updates every row of the table.
pub struct UpdateQuery<'a> {
    conn: &'a mut DatabaseConnection,
    platform: Arc<dyn Platform>,
    table: String,
    assignments: Vec<(String, Assignment)>,
    wheres: Vec<Expression>,
    allow_null: bool,
}

impl<'a> UpdateQuery<'a> {
    pub(crate) fn new(conn: &'a mut DatabaseConnection, platform: Arc<dyn Platform>) -> Self {
        Self {
            conn,
            platform,
            table: String::new(),
            assignments: Vec::new(),
            wheres: Vec::new(),
            allow_null: true,
        }
    }

    pub fn expr(&self) -> ExpressionBuilder {
        ExpressionBuilder::new(self.platform.clone())
    }

    pub fn update(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Assign a quoted value
    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.assignments
            .push((column.into(), Assignment::Value(value.into())));
        self
    }

    /// Assign a raw SQL expression, e.g. `hits + 1`
    pub fn set_raw(mut self, column: impl Into<String>, expression: impl Into<String>) -> Self {
        self.assignments
            .push((column.into(), Assignment::Raw(expression.into())));
        self
    }

    /// Assign parallel lists of columns and values
    pub fn set_all<C, V, S, T>(mut self, columns: C, values: V) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        V: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<SqlValue>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        if columns.len() != values.len() {
            return Err(Error::invalid_argument(
                format!(
                    "{} columns but {} values given to set_all()",
                    columns.len(),
                    values.len()
                ),
                codes::MISMATCHED_VALUES,
            ));
        }
        for (column, value) in columns.into_iter().zip(values) {
            self.assignments.push((column, Assignment::Value(value)));
        }
        Ok(self)
    }

    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    pub fn where_(mut self, constraints: impl Into<Constraint>) -> Result<Self> {
        let parts = collect_constraints("where", constraints)?;
        self.wheres.extend(parts);
        Ok(self)
    }

    pub fn get_sql(&self) -> Result<String> {
        if is_invalid_table_name(&self.table) {
            return Err(Error::invalid_query(
                format!("Invalid table name '{}' for UPDATE", self.table),
                codes::MISSING_TABLE,
            ));
        }
        if self.assignments.is_empty() {
            return Err(Error::invalid_query(
                format!("No values given for UPDATE of '{}'", self.table),
                codes::MISSING_VALUES,
            ));
        }

        let quoter = Quoter::new(self.platform.clone());
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(column, assignment)| match assignment {
                Assignment::Value(value) => {
                    format!("{} = {}", column, quoter.quote(value, self.allow_null))
                }
                Assignment::Raw(sql) => format!("{} = {}", column, sql),
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_predicates(&self.wheres));
        }
        Ok(sql)
    }

    /// Execute and return the number of affected rows
    pub fn execute(self) -> Result<u64> {
        let sql = self.get_sql()?;
        let stmt = self.conn.query(&sql)?;
        Ok(stmt.row_count())
    }
}

impl fmt::Debug for UpdateQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQuery")
            .field("sql", &self.get_sql().ok())
            .finish()
    }
}
