//! Prepared statements
//!
//! SQL is written with `?` positional or `:name` named parameters (never
//! both) and rewritten once into the placeholder syntax of the platform.
//! Quoted strings and identifiers are skipped while scanning, as is the
//! PostgreSQL `::type` cast operator.

use crate::database::connection::DatabaseConnection;
use crate::database::driver::{Row, Statement};
use crate::database::platforms::Platform;
use crate::database::types::SqlValue;
use crate::error::{codes, Error, Result};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParameterStyle {
    None,
    Positional(usize),
    /// Parameter name per placeholder occurrence
    Named(Vec<String>),
}

/// A statement with bound parameters
pub struct PreparedStatement<'a> {
    conn: &'a mut DatabaseConnection,
    sql: String,
    style: ParameterStyle,
    positional: Vec<Option<SqlValue>>,
    named: IndexMap<String, SqlValue>,
    statement: Option<Box<dyn Statement>>,
}

impl<'a> PreparedStatement<'a> {
    pub(crate) fn new(
        conn: &'a mut DatabaseConnection,
        platform: Arc<dyn Platform>,
        sql: &str,
    ) -> Result<Self> {
        let (sql, style) = rewrite_placeholders(sql, platform.as_ref())?;
        let positional = match &style {
            ParameterStyle::Positional(count) => vec![None; *count],
            _ => Vec::new(),
        };
        Ok(Self {
            conn,
            sql,
            style,
            positional,
            named: IndexMap::new(),
            statement: None,
        })
    }

    /// SQL in platform placeholder syntax
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        match &self.style {
            ParameterStyle::None => 0,
            ParameterStyle::Positional(count) => *count,
            ParameterStyle::Named(names) => names.len(),
        }
    }

    /// Bind a positional parameter; positions start at 1
    pub fn bind_value(&mut self, position: usize, value: impl Into<SqlValue>) -> Result<()> {
        match self.positional.get_mut(position.wrapping_sub(1)) {
            Some(slot) => {
                *slot = Some(value.into());
                Ok(())
            }
            None => Err(Error::invalid_argument(
                format!("Statement has no positional parameter {}", position),
                codes::UNKNOWN_PARAMETER,
            )),
        }
    }

    /// Bind a named parameter; the leading colon is optional
    pub fn bind_named(&mut self, name: &str, value: impl Into<SqlValue>) -> Result<()> {
        let name = name.trim_start_matches(':');
        match &self.style {
            ParameterStyle::Named(names) if names.iter().any(|n| n == name) => {
                self.named.insert(name.to_string(), value.into());
                Ok(())
            }
            _ => Err(Error::invalid_argument(
                format!("Statement has no parameter named ':{}'", name),
                codes::UNKNOWN_PARAMETER,
            )),
        }
    }

    /// Bind positional parameters in order, starting at 1
    pub fn bind_values<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        for (index, value) in values.into_iter().enumerate() {
            self.bind_value(index + 1, value)?;
        }
        Ok(())
    }

    fn parameters(&self) -> Result<Vec<SqlValue>> {
        match &self.style {
            ParameterStyle::None => Ok(Vec::new()),
            ParameterStyle::Positional(_) => self
                .positional
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    value.clone().ok_or_else(|| {
                        Error::invalid_argument(
                            format!("Positional parameter {} is not bound", index + 1),
                            codes::UNKNOWN_PARAMETER,
                        )
                    })
                })
                .collect(),
            ParameterStyle::Named(names) => names
                .iter()
                .map(|name| {
                    self.named.get(name).cloned().ok_or_else(|| {
                        Error::invalid_argument(
                            format!("Parameter ':{}' is not bound", name),
                            codes::UNKNOWN_PARAMETER,
                        )
                    })
                })
                .collect(),
        }
    }

    /// Execute with the current bindings; may be called repeatedly
    pub fn execute(&mut self) -> Result<()> {
        let params = self.parameters()?;
        if let Some(mut previous) = self.statement.take() {
            previous.close_cursor();
        }
        self.statement = Some(self.conn.execute_prepared(&self.sql, &params)?);
        Ok(())
    }

    pub fn fetch(&mut self) -> Option<Row> {
        self.statement.as_mut().and_then(|stmt| stmt.fetch())
    }

    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.statement
            .as_mut()
            .map(|stmt| stmt.fetch_all())
            .unwrap_or_default()
    }

    /// Rows returned or affected by the last execution
    pub fn row_count(&self) -> u64 {
        self.statement.as_ref().map(|s| s.row_count()).unwrap_or(0)
    }

    /// Release the result of the last execution
    pub fn free(&mut self) {
        if let Some(mut stmt) = self.statement.take() {
            stmt.close_cursor();
        }
    }
}

impl fmt::Debug for PreparedStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("sql", &self.sql)
            .field("style", &self.style)
            .field("executed", &self.statement.is_some())
            .finish()
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn rewrite_placeholders(sql: &str, platform: &dyn Platform) -> Result<(String, ParameterStyle)> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut positional = 0usize;
    let mut names: Vec<String> = Vec::new();
    let backslash_escapes = platform.backslash_escapes();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                // Copy the quoted run verbatim; doubled quotes (and backslash
                // escapes where the platform has them) stay inside it
                out.push(c);
                i += 1;
                while i < chars.len() {
                    let inner = chars[i];
                    out.push(inner);
                    i += 1;
                    if backslash_escapes && inner == '\\' && c == '\'' && i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    } else if inner == c {
                        if chars.get(i) == Some(&c) {
                            out.push(c);
                            i += 1;
                        } else {
                            break;
                        }
                    }
                }
            }
            '?' => {
                positional += 1;
                out.push_str(&platform.placeholder(positional + names.len()));
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).copied().is_some_and(is_name_start) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                names.push(chars[start..end].iter().collect());
                out.push_str(&platform.placeholder(positional + names.len()));
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    let style = match (positional, names.is_empty()) {
        (0, true) => ParameterStyle::None,
        (count, true) => ParameterStyle::Positional(count),
        (0, false) => ParameterStyle::Named(names),
        _ => {
            return Err(Error::invalid_argument(
                "Positional and named parameters cannot be mixed in one statement",
                codes::UNKNOWN_PARAMETER,
            ))
        }
    };
    Ok((out, style))
}
