//! Expression builder
//!
//! Builds WHERE/HAVING fragments. Operands are taken as already safe SQL:
//! nothing here escapes values, so callers quote literals first (see
//! [`ExpressionBuilder::literal`]). Fragments are modelled as a small tagged
//! type that renders to exactly the strings callers expect.

use crate::database::platforms::Platform;
use crate::database::quoting::Quoter;
use crate::database::types::SqlValue;
use crate::error::{codes, Error, Result};
use std::fmt;
use std::sync::Arc;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    NotLike,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "=",
            ComparisonOperator::NotEquals => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::NotLike => "NOT LIKE",
        }
    }
}

/// Boolean combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// A SQL predicate fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Comparison {
        left: String,
        operator: ComparisonOperator,
        right: String,
    },
    Combinator {
        operator: LogicalOperator,
        parts: Vec<Expression>,
    },
    Negation(Box<Expression>),
    Raw(String),
}

impl Expression {
    pub fn raw(sql: impl Into<String>) -> Self {
        Expression::Raw(sql.into())
    }

    pub fn to_sql(&self) -> String {
        self.to_string()
    }

    /// True for a raw fragment with no content
    pub fn is_empty(&self) -> bool {
        match self {
            Expression::Raw(sql) => sql.trim().is_empty(),
            Expression::Combinator { parts, .. } => parts.is_empty(),
            _ => false,
        }
    }

    /// Combine fragments; a single fragment is returned unwrapped
    pub(crate) fn combine(operator: LogicalOperator, mut parts: Vec<Expression>) -> Expression {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Expression::Combinator { operator, parts }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Comparison {
                left,
                operator,
                right,
            } => write!(f, "{} {} {}", left, operator.as_str(), right),
            Expression::Combinator { operator, parts } => match parts.as_slice() {
                [] => Ok(()),
                [single] => write!(f, "{}", single),
                _ => {
                    let glue = format!(") {} (", operator.as_str());
                    let rendered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                    write!(f, "({})", rendered.join(&glue))
                }
            },
            Expression::Negation(inner) => write!(f, "NOT ({})", inner),
            Expression::Raw(sql) => f.write_str(sql),
        }
    }
}

impl From<Expression> for String {
    fn from(expr: Expression) -> Self {
        expr.to_string()
    }
}

impl From<&str> for Expression {
    fn from(sql: &str) -> Self {
        Expression::Raw(sql.to_string())
    }
}

impl From<String> for Expression {
    fn from(sql: String) -> Self {
        Expression::Raw(sql)
    }
}

impl From<&String> for Expression {
    fn from(sql: &String) -> Self {
        Expression::Raw(sql.clone())
    }
}

/// Constraint argument: one fragment or an arbitrarily nested list of them
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Single(Expression),
    List(Vec<Constraint>),
}

impl Constraint {
    /// Flatten nested lists, dropping empty fragments
    pub fn flatten(self) -> Vec<Expression> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Expression>) {
        match self {
            Constraint::Single(expr) if expr.is_empty() => {}
            Constraint::Single(expr) => out.push(expr),
            Constraint::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl From<Expression> for Constraint {
    fn from(expr: Expression) -> Self {
        Constraint::Single(expr)
    }
}

impl From<&str> for Constraint {
    fn from(sql: &str) -> Self {
        Constraint::Single(sql.into())
    }
}

impl From<String> for Constraint {
    fn from(sql: String) -> Self {
        Constraint::Single(sql.into())
    }
}

impl From<&String> for Constraint {
    fn from(sql: &String) -> Self {
        Constraint::Single(sql.into())
    }
}

impl<T: Into<Constraint>> From<Vec<T>> for Constraint {
    fn from(items: Vec<T>) -> Self {
        Constraint::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Constraint>, const N: usize> From<[T; N]> for Constraint {
    fn from(items: [T; N]) -> Self {
        Constraint::List(items.into_iter().map(Into::into).collect())
    }
}

/// Builder for predicate fragments on one platform
#[derive(Clone)]
pub struct ExpressionBuilder {
    platform: Arc<dyn Platform>,
}

impl ExpressionBuilder {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    fn comparison(
        left: impl fmt::Display,
        operator: ComparisonOperator,
        right: impl fmt::Display,
    ) -> Expression {
        Expression::Comparison {
            left: left.to_string(),
            operator,
            right: right.to_string(),
        }
    }

    pub fn equals(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::Equals, y)
    }

    pub fn not_equals(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::NotEquals, y)
    }

    pub fn less_than(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::LessThan, y)
    }

    pub fn less_than_or_equal(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::LessThanOrEqual, y)
    }

    pub fn greater_than(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::GreaterThan, y)
    }

    pub fn greater_than_or_equal(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::GreaterThanOrEqual, y)
    }

    pub fn like(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::Like, y)
    }

    pub fn not_like(&self, x: impl fmt::Display, y: impl fmt::Display) -> Expression {
        Self::comparison(x, ComparisonOperator::NotLike, y)
    }

    /// `column IN (...)`; an empty list renders per platform
    pub fn in_<T: fmt::Display>(&self, column: &str, values: &[T]) -> Expression {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Expression::Raw(self.platform.in_expression(column, &values))
    }

    /// `column NOT IN (...)`; an empty list renders per platform
    pub fn not_in<T: fmt::Display>(&self, column: &str, values: &[T]) -> Expression {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Expression::Raw(self.platform.not_in_expression(column, &values))
    }

    pub fn is_null(&self, column: &str) -> Expression {
        Expression::Raw(format!("{} IS NULL", column))
    }

    pub fn is_not_null(&self, column: &str) -> Expression {
        Expression::Raw(format!("{} IS NOT NULL", column))
    }

    /// AND-combine fragments; fails when none remain after flattening
    pub fn logical_and(&self, constraints: impl Into<Constraint>) -> Result<Expression> {
        Self::logical(LogicalOperator::And, constraints.into())
    }

    /// OR-combine fragments; fails when none remain after flattening
    pub fn logical_or(&self, constraints: impl Into<Constraint>) -> Result<Expression> {
        Self::logical(LogicalOperator::Or, constraints.into())
    }

    fn logical(operator: LogicalOperator, constraints: Constraint) -> Result<Expression> {
        let parts = constraints.flatten();
        if parts.is_empty() {
            return Err(Error::invalid_argument(
                format!("logical_{}() needs at least one constraint", operator.as_str().to_lowercase()),
                codes::EMPTY_CONSTRAINT_LIST,
            ));
        }
        Ok(Expression::combine(operator, parts))
    }

    pub fn not(&self, expression: impl Into<Expression>) -> Expression {
        Expression::Negation(Box::new(expression.into()))
    }

    pub fn lower(&self, value: &str) -> String {
        self.platform.lower_expression(value)
    }

    pub fn upper(&self, value: &str) -> String {
        self.platform.upper_expression(value)
    }

    /// Quote a value as a string literal for use as an operand
    pub fn literal(&self, value: impl Into<SqlValue>) -> String {
        Quoter::new(self.platform.clone()).quote(&value.into(), true)
    }
}
