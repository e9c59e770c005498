//! PostgreSQL platform

use super::{Platform, TypeMappings};
use crate::database::types::DatabaseBackend;

const DEFAULT_TYPE_MAPPINGS: &[(&str, &str)] = &[
    ("boolean", "boolean"),
    ("bool", "boolean"),
    ("smallint", "smallint"),
    ("int2", "smallint"),
    ("integer", "integer"),
    ("int", "integer"),
    ("int4", "integer"),
    ("serial", "integer"),
    ("bigint", "bigint"),
    ("int8", "bigint"),
    ("bigserial", "bigint"),
    ("numeric", "decimal"),
    ("decimal", "decimal"),
    ("real", "float"),
    ("float4", "float"),
    ("double", "float"),
    ("float8", "float"),
    ("character", "string"),
    ("char", "string"),
    ("bpchar", "string"),
    ("varchar", "string"),
    ("text", "text"),
    ("bytea", "blob"),
    ("date", "date"),
    ("time", "time"),
    ("timestamp", "datetime"),
    ("timestamptz", "datetimetz"),
    ("uuid", "guid"),
    ("json", "json"),
    ("jsonb", "json"),
];

/// PostgreSQL platform
pub struct PostgresPlatform {
    type_mappings: TypeMappings,
}

impl PostgresPlatform {
    pub fn new() -> Self {
        Self {
            type_mappings: TypeMappings::new(DEFAULT_TYPE_MAPPINGS),
        }
    }
}

impl Default for PostgresPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for PostgresPlatform {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn truncate_table_sql(&self, table: &str) -> String {
        format!("TRUNCATE {}", table)
    }

    fn list_databases_sql(&self) -> String {
        "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname".to_string()
    }

    // A PostgreSQL session is bound to one database; introspection covers
    // the current schema of that database.
    fn list_tables_sql(&self, _database: &str) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
            .to_string()
    }

    fn list_table_columns_sql(&self, table: &str, _database: &str) -> String {
        format!(
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = {} \
             ORDER BY ordinal_position",
            self.quote_string_literal(table)
        )
    }

    fn list_table_indexes_sql(&self, table: &str, _database: &str) -> String {
        format!(
            "SELECT t.relname AS table_name, i.relname AS key_name, a.attname AS column_name, \
             CASE WHEN ix.indisunique THEN 0 ELSE 1 END AS non_unique, \
             CASE WHEN ix.indisprimary THEN 1 ELSE 0 END AS is_primary, \
             array_position(ix.indkey::int2[], a.attnum) AS seq_in_index \
             FROM pg_index ix \
             JOIN pg_class t ON t.oid = ix.indrelid \
             JOIN pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
             WHERE t.relname = {} \
             ORDER BY i.relname, seq_in_index",
            self.quote_string_literal(table)
        )
    }

    fn list_charsets_sql(&self) -> String {
        "SELECT pg_encoding_to_char(encoding) AS charset FROM pg_database \
         WHERE datname = current_database()"
            .to_string()
    }

    fn type_mappings(&self) -> &TypeMappings {
        &self.type_mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        let platform = PostgresPlatform::new();
        assert_eq!(platform.quote_identifier("pages"), "\"pages\"");
        assert_eq!(platform.quote_string_literal("It's me"), "'It''s me'");
        assert_eq!(platform.quote_string_literal("a\\b"), "'a\\b'");
    }

    #[test]
    fn test_numbered_placeholders() {
        let platform = PostgresPlatform::new();
        assert_eq!(platform.placeholder(1), "$1");
        assert_eq!(platform.placeholder(12), "$12");
    }

    #[test]
    fn test_limit_and_truncate() {
        let platform = PostgresPlatform::new();
        assert_eq!(platform.modify_limit_query("SELECT 1", Some(5), 2), "SELECT 1 LIMIT 5 OFFSET 2");
        assert_eq!(platform.modify_limit_query("SELECT 1", None, 3), "SELECT 1 OFFSET 3");
        assert_eq!(platform.truncate_table_sql("cache"), "TRUNCATE cache");
        assert_eq!(platform.in_expression("uid", &[]), "1 = 0");
    }

    #[test]
    fn test_portable_types() {
        let platform = PostgresPlatform::new();
        assert_eq!(platform.portable_type("character varying").as_deref(), Some("string"));
        assert_eq!(platform.portable_type("tsvector"), None);
        assert_eq!(platform.portable_type("int8").as_deref(), Some("bigint"));
        assert_eq!(platform.portable_type("timestamp without time zone").as_deref(), Some("datetime"));
    }
}
