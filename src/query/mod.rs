//! Query objects
//!
//! Builders created by [`DatabaseConnection`](crate::DatabaseConnection)
//! factories. Each accumulates clauses through chained calls and renders on
//! demand with `get_sql()`; rendering always reflects the current state.
//! Missing required parts are reported at render time.

pub mod delete;
pub mod expression;
pub mod insert;
pub mod prepared;
pub mod select;
pub mod truncate;
pub mod update;

pub use delete::DeleteQuery;
pub use expression::{Constraint, Expression, ExpressionBuilder};
pub use insert::InsertQuery;
pub use prepared::PreparedStatement;
pub use select::{OrderDirection, SelectQuery};
pub use truncate::TruncateQuery;
pub use update::UpdateQuery;

use crate::error::{codes, Error, Result};
use expression::LogicalOperator;

/// Collect WHERE/HAVING fragments, rejecting calls that contribute nothing
pub(crate) fn collect_constraints(
    clause: &str,
    constraints: impl Into<Constraint>,
) -> Result<Vec<Expression>> {
    let parts = constraints.into().flatten();
    if parts.is_empty() {
        return Err(Error::invalid_argument(
            format!("{}() needs at least one non-empty constraint", clause),
            codes::EMPTY_WHERE_CLAUSE,
        ));
    }
    Ok(parts)
}

/// Render accumulated predicates as one AND-combined fragment
pub(crate) fn render_predicates(parts: &[Expression]) -> String {
    Expression::combine(LogicalOperator::And, parts.to_vec()).to_string()
}

/// True when a table name is empty or purely numeric
pub(crate) fn is_invalid_table_name(table: &str) -> bool {
    let table = table.trim();
    table.is_empty() || table.chars().all(|c| c.is_ascii_digit())
}
