//! SQLite platform
//!
//! SQLite has no TRUNCATE; the platform renders an unconditional DELETE,
//! which leaves AUTOINCREMENT counters in `sqlite_sequence` untouched.

use super::{Platform, TypeMappings};
use crate::database::types::DatabaseBackend;

const DEFAULT_TYPE_MAPPINGS: &[(&str, &str)] = &[
    ("boolean", "boolean"),
    ("tinyint", "boolean"),
    ("smallint", "smallint"),
    ("int", "integer"),
    ("integer", "integer"),
    ("bigint", "bigint"),
    ("numeric", "decimal"),
    ("decimal", "decimal"),
    ("real", "float"),
    ("float", "float"),
    ("double", "float"),
    ("char", "string"),
    ("varchar", "string"),
    ("text", "text"),
    ("clob", "text"),
    ("blob", "blob"),
    ("date", "date"),
    ("time", "time"),
    ("datetime", "datetime"),
    ("timestamp", "datetime"),
];

/// SQLite platform
pub struct SqlitePlatform {
    type_mappings: TypeMappings,
}

impl SqlitePlatform {
    pub fn new() -> Self {
        Self {
            type_mappings: TypeMappings::new(DEFAULT_TYPE_MAPPINGS),
        }
    }
}

impl Default for SqlitePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SqlitePlatform {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::SQLite
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn modify_limit_query(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (Some(limit), 0) => format!("{} LIMIT {}", sql, limit),
            (Some(limit), offset) => format!("{} LIMIT {} OFFSET {}", sql, limit, offset),
            (None, 0) => sql.to_string(),
            (None, offset) => format!("{} LIMIT -1 OFFSET {}", sql, offset),
        }
    }

    fn truncate_table_sql(&self, table: &str) -> String {
        format!("DELETE FROM {}", table)
    }

    // SQLite accepts empty lists natively
    fn in_expression(&self, column: &str, values: &[String]) -> String {
        format!("{} IN ({})", column, values.join(", "))
    }

    fn not_in_expression(&self, column: &str, values: &[String]) -> String {
        format!("{} NOT IN ({})", column, values.join(", "))
    }

    fn list_databases_sql(&self) -> String {
        "PRAGMA database_list".to_string()
    }

    fn list_tables_sql(&self, _database: &str) -> String {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            .to_string()
    }

    fn list_table_columns_sql(&self, table: &str, _database: &str) -> String {
        format!("PRAGMA table_info({})", self.quote_string_literal(table))
    }

    fn list_table_indexes_sql(&self, table: &str, _database: &str) -> String {
        let table = self.quote_string_literal(table);
        format!(
            "SELECT il.name AS key_name, ii.name AS column_name, ii.seqno AS seqno, \
             il.\"unique\" AS is_unique, il.origin AS origin \
             FROM pragma_index_list({}) AS il, pragma_index_info(il.name) AS ii \
             ORDER BY il.name, ii.seqno",
            table
        )
    }

    fn list_charsets_sql(&self) -> String {
        "PRAGMA encoding".to_string()
    }

    fn type_mappings(&self) -> &TypeMappings {
        &self.type_mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_forms() {
        let platform = SqlitePlatform::new();
        assert_eq!(platform.modify_limit_query("SELECT 1", Some(5), 2), "SELECT 1 LIMIT 5 OFFSET 2");
        assert_eq!(platform.modify_limit_query("SELECT 1", None, 4), "SELECT 1 LIMIT -1 OFFSET 4");
    }

    #[test]
    fn test_truncate_is_delete() {
        assert_eq!(SqlitePlatform::new().truncate_table_sql("cache"), "DELETE FROM cache");
    }

    #[test]
    fn test_empty_in_lists_are_native() {
        let platform = SqlitePlatform::new();
        assert_eq!(platform.in_expression("uid", &[]), "uid IN ()");
        assert_eq!(platform.not_in_expression("uid", &[]), "uid NOT IN ()");
    }

    #[test]
    fn test_introspection_sql_quotes_table_name() {
        let platform = SqlitePlatform::new();
        assert_eq!(platform.list_table_columns_sql("it's", "main"), "PRAGMA table_info('it''s')");
    }
}
