//! String helpers of the legacy API
//!
//! Legacy callers pass clauses as loose SQL strings ("ORDER BY uid DESC",
//! "AND deleted = 0", "10,20"). These functions normalize them before they
//! reach the query objects.

use crate::error::{codes, Error, Result};
use crate::query::OrderDirection;
use once_cell::sync::Lazy;
use regex::Regex;

static ORDER_BY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:ORDER\s*BY\s*)+").expect("legacy helpers: invalid prefix regex")
});

static GROUP_BY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:GROUP\s*BY\s*)+").expect("legacy helpers: invalid prefix regex")
});

static LOGICAL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:AND|OR)\b\s*)+").expect("legacy helpers: invalid prefix regex")
});

/// Remove any number of leading `ORDER BY` keywords
pub fn strip_order_by(clause: &str) -> String {
    ORDER_BY_PREFIX.replace(clause.trim(), "").trim().to_string()
}

/// Remove any number of leading `GROUP BY` keywords
pub fn strip_group_by(clause: &str) -> String {
    GROUP_BY_PREFIX.replace(clause.trim(), "").trim().to_string()
}

/// Remove leading `AND`/`OR` operators from a WHERE fragment
pub fn strip_logical_operator_prefix(clause: &str) -> String {
    LOGICAL_PREFIX.replace(clause.trim(), "").trim().to_string()
}

/// Integer value of the leading numeric part of a string, 0 if there is none
pub fn intval(value: &str) -> i64 {
    let value = value.trim_start();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let digits: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(if digits.is_empty() { 0 } else { sign * i64::MAX })
}

/// Cast every entry to an integer
pub fn clean_int_array<S: AsRef<str>>(values: &[S]) -> Vec<i64> {
    values.iter().map(|v| intval(v.as_ref())).collect()
}

/// Cast every entry of a comma separated list to an integer
pub fn clean_int_list(list: &str) -> String {
    list.split(',')
        .map(|v| intval(v).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a clause on commas outside parentheses and quotes
fn split_top_level(clause: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in clause.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                items.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// One entry of a legacy ORDER BY list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderItem {
    /// A column with an explicit or implied direction
    Column(String, OrderDirection),
    /// An expression passed through untouched
    Raw(String),
}

/// Split an ORDER BY clause into its entries
///
/// A trailing `ASC`/`DESC` is peeled off; a bare column sorts ascending.
/// Anything else (function calls, `NULLS LAST`, ...) stays raw.
pub fn parse_order_by(clause: &str) -> Vec<OrderItem> {
    split_top_level(&strip_order_by(clause))
        .into_iter()
        .map(|item| {
            if let Some((column, direction)) = item.rsplit_once(char::is_whitespace) {
                if let Ok(direction) = direction.parse::<OrderDirection>() {
                    return OrderItem::Column(column.trim().to_string(), direction);
                }
            }
            if item.chars().all(is_column_char) {
                OrderItem::Column(item, OrderDirection::Asc)
            } else {
                OrderItem::Raw(item)
            }
        })
        .collect()
}

fn is_column_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '`' | '"')
}

/// Split a GROUP BY clause into columns
pub fn parse_group_by(clause: &str) -> Vec<String> {
    split_top_level(&strip_group_by(clause))
}

/// Parse a legacy LIMIT: `"count"` or `"offset,count"`
pub fn parse_limit(limit: &str) -> Result<Option<(u64, u64)>> {
    let limit = limit.trim();
    if limit.is_empty() {
        return Ok(None);
    }
    let invalid = || {
        Error::invalid_argument(
            format!("Invalid LIMIT '{}'; expected 'count' or 'offset,count'", limit),
            codes::INVALID_LIMIT,
        )
    };
    let number = |s: &str| s.trim().parse::<u64>().map_err(|_| invalid());
    match limit.split_once(',') {
        Some((offset, count)) => Ok(Some((number(count)?, number(offset)?))),
        None => Ok(Some((number(limit)?, 0))),
    }
}
