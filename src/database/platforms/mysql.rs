//! MySQL/MariaDB platform
//!
//! Identifiers use backticks and string literals use backslash escaping,
//! which only holds while the session runs without `NO_BACKSLASH_ESCAPES`.
//! The connection core strips that mode right after connecting.

use super::{Platform, TypeMappings};
use crate::database::types::DatabaseBackend;

/// Largest LIMIT MySQL accepts; used when only an offset is requested
pub const MAX_LIMIT: u64 = u64::MAX;

const DEFAULT_TYPE_MAPPINGS: &[(&str, &str)] = &[
    ("tinyint", "boolean"),
    ("smallint", "smallint"),
    ("mediumint", "integer"),
    ("int", "integer"),
    ("integer", "integer"),
    ("bigint", "bigint"),
    ("decimal", "decimal"),
    ("numeric", "decimal"),
    ("float", "float"),
    ("double", "float"),
    ("real", "float"),
    ("char", "string"),
    ("varchar", "string"),
    ("tinytext", "text"),
    ("text", "text"),
    ("mediumtext", "text"),
    ("longtext", "text"),
    ("binary", "binary"),
    ("varbinary", "binary"),
    ("tinyblob", "blob"),
    ("blob", "blob"),
    ("mediumblob", "blob"),
    ("longblob", "blob"),
    ("date", "date"),
    ("time", "time"),
    ("datetime", "datetime"),
    ("timestamp", "datetime"),
    ("year", "date"),
    ("json", "json"),
];

/// MySQL/MariaDB platform
pub struct MySqlPlatform {
    backend: DatabaseBackend,
    type_mappings: TypeMappings,
}

impl MySqlPlatform {
    pub fn new() -> Self {
        Self {
            backend: DatabaseBackend::MySQL,
            type_mappings: TypeMappings::new(DEFAULT_TYPE_MAPPINGS),
        }
    }

    pub fn mariadb() -> Self {
        Self {
            backend: DatabaseBackend::MariaDB,
            type_mappings: TypeMappings::new(DEFAULT_TYPE_MAPPINGS),
        }
    }
}

impl Default for MySqlPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MySqlPlatform {
    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    fn name(&self) -> &'static str {
        match self.backend {
            DatabaseBackend::MariaDB => "mariadb",
            _ => "mysql",
        }
    }

    fn backslash_escapes(&self) -> bool {
        true
    }

    fn identifier_quote_char(&self) -> char {
        '`'
    }

    fn quote_string_literal(&self, value: &str) -> String {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        for c in value.chars() {
            match c {
                '\\' => quoted.push_str("\\\\"),
                '\'' => quoted.push_str("\\'"),
                '"' => quoted.push_str("\\\""),
                '\0' => quoted.push_str("\\0"),
                '\n' => quoted.push_str("\\n"),
                '\r' => quoted.push_str("\\r"),
                '\x1a' => quoted.push_str("\\Z"),
                other => quoted.push(other),
            }
        }
        quoted.push('\'');
        quoted
    }

    fn modify_limit_query(&self, sql: &str, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (Some(limit), 0) => format!("{} LIMIT {}", sql, limit),
            (Some(limit), offset) => format!("{} LIMIT {} OFFSET {}", sql, limit, offset),
            (None, 0) => sql.to_string(),
            // MySQL has no OFFSET without LIMIT
            (None, offset) => format!("{} LIMIT {} OFFSET {}", sql, MAX_LIMIT, offset),
        }
    }

    fn truncate_table_sql(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", table)
    }

    fn find_in_set_expression(&self, column: &str, value: &str) -> String {
        format!("FIND_IN_SET({}, {})", self.quote_string_literal(value), column)
    }

    fn list_databases_sql(&self) -> String {
        "SHOW DATABASES".to_string()
    }

    fn list_tables_sql(&self, database: &str) -> String {
        format!("SHOW TABLE STATUS FROM {}", self.quote_identifier(database))
    }

    fn list_table_columns_sql(&self, table: &str, database: &str) -> String {
        format!(
            "SHOW FULL COLUMNS FROM {} FROM {}",
            self.quote_single_identifier(table),
            self.quote_identifier(database)
        )
    }

    fn list_table_indexes_sql(&self, table: &str, database: &str) -> String {
        format!(
            "SHOW KEYS FROM {} FROM {}",
            self.quote_single_identifier(table),
            self.quote_identifier(database)
        )
    }

    fn list_charsets_sql(&self) -> String {
        "SHOW CHARACTER SET".to_string()
    }

    fn type_mappings(&self) -> &TypeMappings {
        &self.type_mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslash_escaping() {
        let platform = MySqlPlatform::new();
        assert_eq!(platform.quote_string_literal("It's me"), "'It\\'s me'");
        assert_eq!(platform.quote_string_literal("a\\b"), "'a\\\\b'");
        assert_eq!(platform.quote_string_literal("say \"hi\""), "'say \\\"hi\\\"'");
        assert_eq!(platform.quote_string_literal("line\nbreak"), "'line\\nbreak'");
    }

    #[test]
    fn test_backtick_identifiers() {
        let platform = MySqlPlatform::new();
        assert_eq!(platform.quote_identifier("pages"), "`pages`");
        assert_eq!(platform.quote_identifier("pages.uid"), "`pages`.`uid`");
        assert_eq!(platform.quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_limit_forms() {
        let platform = MySqlPlatform::new();
        assert_eq!(platform.modify_limit_query("SELECT 1", Some(5), 2), "SELECT 1 LIMIT 5 OFFSET 2");
        assert_eq!(platform.modify_limit_query("SELECT 1", Some(5), 0), "SELECT 1 LIMIT 5");
        assert_eq!(platform.modify_limit_query("SELECT 1", None, 0), "SELECT 1");
        assert_eq!(
            platform.modify_limit_query("SELECT 1", None, 10),
            "SELECT 1 LIMIT 18446744073709551615 OFFSET 10"
        );
    }

    #[test]
    fn test_truncate_and_empty_in() {
        let platform = MySqlPlatform::new();
        assert_eq!(platform.truncate_table_sql("cache"), "TRUNCATE TABLE cache");
        assert_eq!(platform.in_expression("uid", &[]), "1 = 0");
        assert_eq!(platform.not_in_expression("uid", &[]), "1 = 1");
        assert_eq!(
            platform.in_expression("uid", &["1".to_string(), "2".to_string()]),
            "uid IN (1, 2)"
        );
    }

    #[test]
    fn test_find_in_set() {
        let platform = MySqlPlatform::new();
        assert_eq!(platform.find_in_set_expression("fe_group", "5"), "FIND_IN_SET('5', fe_group)");
    }

    #[test]
    fn test_introspection_sql() {
        let platform = MySqlPlatform::new();
        assert_eq!(platform.list_tables_sql("cms"), "SHOW TABLE STATUS FROM `cms`");
        assert_eq!(
            platform.list_table_columns_sql("pages", "cms"),
            "SHOW FULL COLUMNS FROM `pages` FROM `cms`"
        );
        assert_eq!(platform.portable_type("varchar(255)").as_deref(), Some("string"));
    }
}
