//! SELECT query object

use super::expression::{Constraint, Expression, ExpressionBuilder};
use super::{collect_constraints, render_predicates};
use crate::database::connection::DatabaseConnection;
use crate::database::driver::Statement;
use crate::database::platforms::Platform;
use crate::error::{codes, Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            _ => Err(Error::invalid_argument(
                format!("Order direction must be ASC or DESC, got '{}'", s),
                codes::INVALID_ORDER_DIRECTION,
            )),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_blank<I, S>(parts: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts
        .into_iter()
        .map(Into::into)
        .filter(|part: &String| !part.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    table: String,
    condition: String,
}

/// SELECT builder
pub struct SelectQuery<'a> {
    conn: &'a mut DatabaseConnection,
    platform: Arc<dyn Platform>,
    distinct: bool,
    columns: Vec<String>,
    from: Vec<String>,
    joins: Vec<Join>,
    wheres: Vec<Expression>,
    group_by: Vec<String>,
    having: Vec<Expression>,
    order_by: Vec<(String, Option<OrderDirection>)>,
    limit: Option<u64>,
    offset: u64,
}

impl<'a> SelectQuery<'a> {
    pub(crate) fn new(conn: &'a mut DatabaseConnection, platform: Arc<dyn Platform>) -> Self {
        Self {
            conn,
            platform,
            distinct: false,
            columns: Vec::new(),
            from: Vec::new(),
            joins: Vec::new(),
            wheres: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Expression builder for this query's platform
    pub fn expr(&self) -> ExpressionBuilder {
        ExpressionBuilder::new(self.platform.clone())
    }

    /// `name AS alias`
    pub fn alias(name: &str, alias: &str) -> String {
        format!("{} AS {}", name, alias)
    }

    /// Append columns to the select list; blank entries are ignored
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(non_blank(columns));
        self
    }

    /// Append columns and mark the query DISTINCT
    pub fn select_distinct<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct = true;
        self.select(columns)
    }

    /// Append plain FROM table references; blank entries are ignored
    pub fn from<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.from.extend(non_blank(tables));
        self
    }

    pub fn join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.add_join(JoinKind::Inner, table.into(), condition.into())
    }

    pub fn left_join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.add_join(JoinKind::Left, table.into(), condition.into())
    }

    pub fn right_join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.add_join(JoinKind::Right, table.into(), condition.into())
    }

    fn add_join(mut self, kind: JoinKind, table: String, condition: String) -> Self {
        self.joins.push(Join {
            kind,
            table,
            condition,
        });
        self
    }

    /// Add AND-combined predicates; empty fragments are dropped
    pub fn where_(mut self, constraints: impl Into<Constraint>) -> Result<Self> {
        let parts = collect_constraints("where", constraints)?;
        self.wheres.extend(parts);
        Ok(self)
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having(mut self, constraints: impl Into<Constraint>) -> Result<Self> {
        let parts = collect_constraints("having", constraints)?;
        self.having.extend(parts);
        Ok(self)
    }

    /// Add an ORDER BY column; direction must be ASC or DESC
    pub fn order_by(mut self, column: impl Into<String>, direction: &str) -> Result<Self> {
        let direction: OrderDirection = direction.parse()?;
        self.order_by.push((column.into(), Some(direction)));
        Ok(self)
    }

    /// Add an ORDER BY expression rendered exactly as given
    pub fn order_by_raw(mut self, expression: impl Into<String>) -> Self {
        self.order_by.push((expression.into(), None));
        self
    }

    pub fn limit(mut self, count: u64, offset: u64) -> Self {
        self.limit = Some(count);
        self.offset = offset;
        self
    }

    /// Skip rows without bounding the result size
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Render the statement
    pub fn get_sql(&self) -> Result<String> {
        if self.columns.is_empty() {
            return Err(Error::invalid_query(
                "No SELECT columns given; call select() first",
                codes::MISSING_SELECT,
            ));
        }
        if self.from.is_empty() {
            return Err(Error::invalid_query(
                "No FROM table given; call from() first",
                codes::MISSING_FROM,
            ));
        }

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.columns.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&self.from.join(", "));

        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {}",
                join.kind.as_str(),
                join.table,
                join.condition
            ));
        }
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_predicates(&self.wheres));
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&render_predicates(&self.having));
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| match direction {
                    Some(direction) => format!("{} {}", column, direction),
                    None => column.clone(),
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if self.limit.is_some() || self.offset > 0 {
            sql = self.platform.modify_limit_query(&sql, self.limit, self.offset);
        }
        Ok(sql)
    }

    /// Execute and return the row cursor
    pub fn execute(self) -> Result<Box<dyn Statement>> {
        let sql = self.get_sql()?;
        self.conn.query(&sql)
    }
}

impl fmt::Debug for SelectQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("sql", &self.get_sql().ok())
            .finish()
    }
}
