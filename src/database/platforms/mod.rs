//! Backend platforms
//!
//! A platform encodes the SQL dialect differences the query objects and the
//! connection core must not hardcode: identifier and literal quoting, LIMIT
//! syntax, TRUNCATE semantics, case folding, IN lists and introspection SQL.

use crate::database::types::DatabaseBackend;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySqlPlatform;
pub use postgres::PostgresPlatform;
pub use sqlite::SqlitePlatform;

/// Dialect-specific SQL generation
pub trait Platform: Send + Sync {
    fn backend(&self) -> DatabaseBackend;

    fn name(&self) -> &'static str;

    /// Character used to delimit identifiers
    fn identifier_quote_char(&self) -> char {
        '"'
    }

    /// Quote a single identifier segment, doubling embedded quote characters
    fn quote_single_identifier(&self, identifier: &str) -> String {
        let q = self.identifier_quote_char();
        let doubled = format!("{}{}", q, q);
        format!("{}{}{}", q, identifier.replace(q, &doubled), q)
    }

    /// Quote an identifier; dotted names are quoted segment by segment
    fn quote_identifier(&self, identifier: &str) -> String {
        identifier
            .split('.')
            .map(|segment| {
                if segment == "*" {
                    segment.to_string()
                } else {
                    self.quote_single_identifier(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Whether `\` escapes the next character inside string literals
    fn backslash_escapes(&self) -> bool {
        false
    }

    /// Quote a string literal including the surrounding single quotes
    fn quote_string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Bound parameter placeholder for a 1-based position
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    /// Cheap statement used to verify a fresh connection
    fn dummy_select_sql(&self) -> String {
        "SELECT 1".to_string()
    }

    /// Append LIMIT/OFFSET to a rendered statement
    fn modify_limit_query(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        let mut query = sql.to_string();
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        if offset > 0 {
            query.push_str(&format!(" OFFSET {}", offset));
        }
        query
    }

    fn truncate_table_sql(&self, table: &str) -> String;

    fn lower_expression(&self, value: &str) -> String {
        format!("LOWER({})", value)
    }

    fn upper_expression(&self, value: &str) -> String {
        format!("UPPER({})", value)
    }

    /// `column IN (...)` over already quoted values
    fn in_expression(&self, column: &str, values: &[String]) -> String {
        if values.is_empty() {
            return "1 = 0".to_string();
        }
        format!("{} IN ({})", column, values.join(", "))
    }

    /// `column NOT IN (...)` over already quoted values
    fn not_in_expression(&self, column: &str, values: &[String]) -> String {
        if values.is_empty() {
            return "1 = 1".to_string();
        }
        format!("{} NOT IN ({})", column, values.join(", "))
    }

    /// Membership test of a single value in a comma separated list column
    fn find_in_set_expression(&self, column: &str, value: &str) -> String {
        let pattern = format!("%,{},%", crate::database::quoting::escape_like(value));
        format!(
            "(',' || {} || ',') LIKE {} ESCAPE '\\'",
            column,
            self.quote_string_literal(&pattern)
        )
    }

    fn list_databases_sql(&self) -> String;

    fn list_tables_sql(&self, database: &str) -> String;

    fn list_table_columns_sql(&self, table: &str, database: &str) -> String;

    fn list_table_indexes_sql(&self, table: &str, database: &str) -> String;

    fn list_charsets_sql(&self) -> String;

    fn type_mappings(&self) -> &TypeMappings;

    /// Map a database type name onto a portable type name
    fn register_type_mapping(&self, db_type: &str, portable_type: &str) {
        self.type_mappings().register(db_type, portable_type);
    }

    /// Portable type for a column type such as `varchar(255)` or `int unsigned`
    fn portable_type(&self, column_type: &str) -> Option<String> {
        self.type_mappings().resolve(column_type)
    }
}

/// Registry of database type name to portable type name
#[derive(Debug, Default)]
pub struct TypeMappings {
    mappings: RwLock<HashMap<String, String>>,
}

impl TypeMappings {
    pub fn new(defaults: &[(&str, &str)]) -> Self {
        let mappings = defaults
            .iter()
            .map(|(db, portable)| (db.to_string(), portable.to_string()))
            .collect();
        Self {
            mappings: RwLock::new(mappings),
        }
    }

    pub fn register(&self, db_type: &str, portable_type: &str) {
        if let Ok(mut mappings) = self.mappings.write() {
            mappings.insert(db_type.to_lowercase(), portable_type.to_string());
        }
    }

    pub fn has(&self, db_type: &str) -> bool {
        self.mappings
            .read()
            .map(|m| m.contains_key(&db_type.to_lowercase()))
            .unwrap_or(false)
    }

    /// Resolve the base name of a column type (length and modifiers dropped)
    pub fn resolve(&self, column_type: &str) -> Option<String> {
        let lowered = column_type.trim().to_lowercase();
        let base = lowered
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        self.mappings.read().ok()?.get(base).cloned()
    }
}

/// Factory function to create the platform for a backend
pub fn create_platform(backend: DatabaseBackend) -> Arc<dyn Platform> {
    match backend {
        DatabaseBackend::Postgres => Arc::new(PostgresPlatform::new()),
        DatabaseBackend::MySQL => Arc::new(MySqlPlatform::new()),
        DatabaseBackend::MariaDB => Arc::new(MySqlPlatform::mariadb()),
        DatabaseBackend::SQLite => Arc::new(SqlitePlatform::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform() {
        assert_eq!(
            create_platform(DatabaseBackend::MariaDB).backend(),
            DatabaseBackend::MariaDB
        );
        assert_eq!(create_platform(DatabaseBackend::SQLite).name(), "sqlite");
    }

    #[test]
    fn test_dotted_identifiers_quote_each_segment() {
        let platform = create_platform(DatabaseBackend::Postgres);
        assert_eq!(platform.quote_identifier("pages.uid"), "\"pages\".\"uid\"");
        assert_eq!(platform.quote_identifier("pages.*"), "\"pages\".*");
        assert_eq!(platform.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_type_mappings_resolve_base_name() {
        let mappings = TypeMappings::new(&[("varchar", "string"), ("int", "integer")]);
        assert_eq!(mappings.resolve("VARCHAR(255)").as_deref(), Some("string"));
        assert_eq!(mappings.resolve("int unsigned").as_deref(), Some("integer"));
        assert_eq!(mappings.resolve("enum('a','b')"), None);

        mappings.register("ENUM", "string");
        assert!(mappings.has("enum"));
        assert_eq!(mappings.resolve("enum('a','b')").as_deref(), Some("string"));
    }

    #[test]
    fn test_find_in_set_fallback_uses_like() {
        let platform = create_platform(DatabaseBackend::SQLite);
        assert_eq!(
            platform.find_in_set_expression("fe_group", "5"),
            "(',' || fe_group || ',') LIKE '%,5,%' ESCAPE '\\'"
        );
    }
}
