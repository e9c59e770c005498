//! DELETE query object

use super::expression::{Constraint, Expression, ExpressionBuilder};
use super::{collect_constraints, render_predicates};
use crate::database::connection::DatabaseConnection;
use crate::database::platforms::Platform;
use crate::error::{codes, Error, Result};
use std::fmt;
use std::sync::Arc;

/// DELETE builder
///
/// Without a `where_()` call the statement deletes every row of the table.
pub struct DeleteQuery<'a> {
    conn: &'a mut DatabaseConnection,
    platform: Arc<dyn Platform>,
    table: String,
    alias: Option<String>,
    wheres: Vec<Expression>,
}

impl<'a> DeleteQuery<'a> {
    pub(crate) fn new(conn: &'a mut DatabaseConnection, platform: Arc<dyn Platform>) -> Self {
        Self {
            conn,
            platform,
            table: String::new(),
            alias: None,
            wheres: Vec::new(),
        }
    }

    pub fn expr(&self) -> ExpressionBuilder {
        ExpressionBuilder::new(self.platform.clone())
    }

    pub fn delete(mut self, table: impl Into<String>, alias: Option<&str>) -> Self {
        self.table = table.into();
        self.alias = alias.filter(|a| !a.is_empty()).map(str::to_string);
        self
    }

    pub fn where_(mut self, constraints: impl Into<Constraint>) -> Result<Self> {
        let parts = collect_constraints("where", constraints)?;
        self.wheres.extend(parts);
        Ok(self)
    }

    pub fn get_sql(&self) -> Result<String> {
        if self.table.trim().is_empty() {
            return Err(Error::invalid_query(
                "No table given for DELETE",
                codes::MISSING_TABLE,
            ));
        }
        let mut sql = format!("DELETE FROM {}", self.table);
        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(alias);
        }
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_predicates(&self.wheres));
        }
        Ok(sql)
    }

    /// Execute and return the number of deleted rows
    pub fn execute(self) -> Result<u64> {
        let sql = self.get_sql()?;
        let stmt = self.conn.query(&sql)?;
        Ok(stmt.row_count())
    }
}

impl fmt::Debug for DeleteQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteQuery")
            .field("sql", &self.get_sql().ok())
            .finish()
    }
}
