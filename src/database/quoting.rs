//! Quoting subsystem
//!
//! Turns values into SQL literals and names into quoted identifiers for the
//! platform of the live connection. Everything here is pure string work.

use crate::database::platforms::Platform;
use crate::database::types::SqlValue;
use indexmap::IndexMap;
use std::sync::Arc;

/// Escape the LIKE wildcards `%` and `_` (and the escape character itself)
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Value and identifier quoting bound to one platform
#[derive(Clone)]
pub struct Quoter {
    platform: Arc<dyn Platform>,
}

impl Quoter {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Quote a value as a string literal
    ///
    /// NULL renders as the keyword `NULL` when `allow_null` is set and as
    /// an empty string literal otherwise.
    pub fn quote(&self, value: &SqlValue, allow_null: bool) -> String {
        match value.to_literal() {
            None if allow_null => "NULL".to_string(),
            None => self.platform.quote_string_literal(""),
            Some(literal) => self.platform.quote_string_literal(&literal),
        }
    }

    /// Escape a string for embedding between quotes the caller adds itself
    pub fn quote_str(&self, value: &str) -> String {
        let quoted = self.platform.quote_string_literal(value);
        strip_outer_quotes(&quoted).to_string()
    }

    /// Escape and wrap a string in single quotes
    pub fn full_quote_str(&self, value: &str) -> String {
        self.platform.quote_string_literal(value)
    }

    /// Quote every value of a field map except the listed fields
    ///
    /// Excluded fields are passed through verbatim, which makes them raw SQL.
    pub fn full_quote_array(
        &self,
        values: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        allow_null: bool,
    ) -> IndexMap<String, String> {
        values
            .iter()
            .map(|(field, value)| {
                let rendered = if no_quote_fields.contains(&field.as_str()) {
                    value.to_literal().unwrap_or_else(|| "NULL".to_string())
                } else {
                    self.quote(value, allow_null)
                };
                (field.clone(), rendered)
            })
            .collect()
    }

    pub fn quote_identifier(&self, identifier: &str) -> String {
        self.platform.quote_identifier(identifier)
    }

    /// Quote a column, optionally qualified with its table
    pub fn quote_column(&self, column: &str, table: Option<&str>) -> String {
        match table {
            Some(table) if !table.is_empty() => format!(
                "{}.{}",
                self.platform.quote_identifier(table),
                self.platform.quote_identifier(column)
            ),
            _ => self.platform.quote_identifier(column),
        }
    }

    pub fn quote_table(&self, table: &str) -> String {
        self.platform.quote_identifier(table)
    }

    /// Escape LIKE wildcards; the result still needs literal quoting
    pub fn escape_str_for_like(&self, value: &str) -> String {
        escape_like(value)
    }
}

fn strip_outer_quotes(quoted: &str) -> &str {
    quoted
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(quoted)
}
