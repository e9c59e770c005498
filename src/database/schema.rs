//! Schema introspection
//!
//! Runs the platform's introspection SQL over a driver connection and
//! normalizes the backend-specific result shapes into common records.

use crate::database::driver::{DriverConnection, Row};
use crate::database::platforms::Platform;
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::error::Result;
use serde::Serialize;
use std::sync::Arc;

/// Table metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub engine: Option<String>,
    pub rows: Option<u64>,
    pub comment: String,
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub field: String,
    /// Type as reported by the server, e.g. `varchar(255)`
    pub type_name: String,
    pub portable_type: Option<String>,
    pub nullable: bool,
    /// `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

/// One column of one index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub table: String,
    /// `PRIMARY` for the primary key
    pub key_name: String,
    pub column_name: String,
    pub non_unique: bool,
    /// 1-based position of the column inside the index
    pub seq_in_index: u32,
}

/// Character set offered by the server
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharsetInfo {
    pub name: String,
    pub description: String,
}

/// Introspection over an open driver connection
pub trait SchemaManager: Send + Sync {
    fn list_databases(&self, conn: &mut dyn DriverConnection) -> Result<Vec<String>>;

    fn list_tables(&self, conn: &mut dyn DriverConnection, database: &str) -> Result<Vec<TableInfo>>;

    fn list_table_columns(
        &self,
        conn: &mut dyn DriverConnection,
        table: &str,
        database: &str,
    ) -> Result<Vec<ColumnInfo>>;

    fn list_table_indexes(
        &self,
        conn: &mut dyn DriverConnection,
        table: &str,
        database: &str,
    ) -> Result<Vec<IndexInfo>>;

    fn list_charsets(&self, conn: &mut dyn DriverConnection) -> Result<Vec<CharsetInfo>>;
}

/// Schema manager driven by the platform's introspection SQL
pub struct SqlSchemaManager {
    platform: Arc<dyn Platform>,
}

impl SqlSchemaManager {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    fn backend(&self) -> DatabaseBackend {
        self.platform.backend()
    }

    fn rows(&self, conn: &mut dyn DriverConnection, sql: &str) -> Result<Vec<Row>> {
        log::debug!("Schema introspection: {}", sql);
        let mut stmt = conn.query(sql)?;
        let rows = stmt.fetch_all();
        stmt.close_cursor();
        Ok(rows)
    }

    fn column_from_row(&self, row: &Row) -> ColumnInfo {
        let (field, type_name, nullable, key, default, extra) = match self.backend() {
            DatabaseBackend::SQLite => (
                text(row, "name"),
                text(row, "type"),
                int(row, "notnull") == 0,
                if int(row, "pk") > 0 { "PRI".to_string() } else { String::new() },
                opt_text(row, "dflt_value"),
                String::new(),
            ),
            DatabaseBackend::Postgres => (
                text(row, "column_name"),
                text(row, "data_type"),
                text(row, "is_nullable").eq_ignore_ascii_case("YES"),
                String::new(),
                opt_text(row, "column_default"),
                String::new(),
            ),
            DatabaseBackend::MySQL | DatabaseBackend::MariaDB => (
                text(row, "Field"),
                text(row, "Type"),
                text(row, "Null").eq_ignore_ascii_case("YES"),
                text(row, "Key"),
                opt_text(row, "Default"),
                text(row, "Extra"),
            ),
        };
        let portable_type = self.platform.portable_type(&type_name);
        ColumnInfo {
            field,
            type_name,
            portable_type,
            nullable,
            key,
            default,
            extra,
        }
    }

    fn index_from_row(&self, row: &Row, table: &str) -> IndexInfo {
        match self.backend() {
            DatabaseBackend::SQLite => IndexInfo {
                table: table.to_string(),
                key_name: if text(row, "origin") == "pk" {
                    "PRIMARY".to_string()
                } else {
                    text(row, "key_name")
                },
                column_name: text(row, "column_name"),
                non_unique: int(row, "is_unique") == 0,
                seq_in_index: int(row, "seqno") as u32 + 1,
            },
            DatabaseBackend::Postgres => IndexInfo {
                table: table.to_string(),
                key_name: if int(row, "is_primary") == 1 {
                    "PRIMARY".to_string()
                } else {
                    text(row, "key_name")
                },
                column_name: text(row, "column_name"),
                non_unique: int(row, "non_unique") == 1,
                seq_in_index: int(row, "seq_in_index") as u32,
            },
            DatabaseBackend::MySQL | DatabaseBackend::MariaDB => IndexInfo {
                table: text(row, "Table"),
                key_name: text(row, "Key_name"),
                column_name: text(row, "Column_name"),
                non_unique: int(row, "Non_unique") == 1,
                seq_in_index: int(row, "Seq_in_index") as u32,
            },
        }
    }
}

impl SchemaManager for SqlSchemaManager {
    fn list_databases(&self, conn: &mut dyn DriverConnection) -> Result<Vec<String>> {
        let key = match self.backend() {
            DatabaseBackend::SQLite => "name",
            DatabaseBackend::Postgres => "datname",
            DatabaseBackend::MySQL | DatabaseBackend::MariaDB => "Database",
        };
        let rows = self.rows(conn, &self.platform.list_databases_sql())?;
        Ok(rows.iter().map(|row| text(row, key)).collect())
    }

    fn list_tables(&self, conn: &mut dyn DriverConnection, database: &str) -> Result<Vec<TableInfo>> {
        let rows = self.rows(conn, &self.platform.list_tables_sql(database))?;
        let tables = rows
            .iter()
            .map(|row| match self.backend() {
                DatabaseBackend::MySQL | DatabaseBackend::MariaDB => TableInfo {
                    name: text(row, "Name"),
                    engine: opt_text(row, "Engine"),
                    rows: field(row, "Rows").and_then(SqlValue::as_i64).map(|n| n as u64),
                    comment: text(row, "Comment"),
                },
                DatabaseBackend::Postgres => TableInfo {
                    name: text(row, "table_name"),
                    engine: None,
                    rows: None,
                    comment: String::new(),
                },
                DatabaseBackend::SQLite => TableInfo {
                    name: text(row, "name"),
                    engine: None,
                    rows: None,
                    comment: String::new(),
                },
            })
            .collect();
        Ok(tables)
    }

    fn list_table_columns(
        &self,
        conn: &mut dyn DriverConnection,
        table: &str,
        database: &str,
    ) -> Result<Vec<ColumnInfo>> {
        let rows = self.rows(conn, &self.platform.list_table_columns_sql(table, database))?;
        Ok(rows.iter().map(|row| self.column_from_row(row)).collect())
    }

    fn list_table_indexes(
        &self,
        conn: &mut dyn DriverConnection,
        table: &str,
        database: &str,
    ) -> Result<Vec<IndexInfo>> {
        let rows = self.rows(conn, &self.platform.list_table_indexes_sql(table, database))?;
        Ok(rows.iter().map(|row| self.index_from_row(row, table)).collect())
    }

    fn list_charsets(&self, conn: &mut dyn DriverConnection) -> Result<Vec<CharsetInfo>> {
        let rows = self.rows(conn, &self.platform.list_charsets_sql())?;
        let charsets = rows
            .iter()
            .map(|row| match self.backend() {
                DatabaseBackend::MySQL | DatabaseBackend::MariaDB => CharsetInfo {
                    name: text(row, "Charset"),
                    description: text(row, "Description"),
                },
                DatabaseBackend::Postgres => CharsetInfo {
                    name: text(row, "charset"),
                    description: text(row, "charset"),
                },
                DatabaseBackend::SQLite => CharsetInfo {
                    name: text(row, "encoding"),
                    description: text(row, "encoding"),
                },
            })
            .collect();
        Ok(charsets)
    }
}

/// Column lookup, exact name first and then case-insensitive
fn field<'r>(row: &'r Row, key: &str) -> Option<&'r SqlValue> {
    row.get(key).or_else(|| {
        row.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn opt_text(row: &Row, key: &str) -> Option<String> {
    field(row, key).and_then(SqlValue::to_literal)
}

fn text(row: &Row, key: &str) -> String {
    opt_text(row, key).unwrap_or_default()
}

fn int(row: &Row, key: &str) -> i64 {
    field(row, key).and_then(SqlValue::as_i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::platforms::create_platform;

    fn row(pairs: &[(&str, SqlValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_mysql_column_normalization() {
        let manager = SqlSchemaManager::new(create_platform(DatabaseBackend::MySQL));
        let column = manager.column_from_row(&row(&[
            ("Field", "title".into()),
            ("Type", "varchar(255)".into()),
            ("Null", "NO".into()),
            ("Key", "".into()),
            ("Default", SqlValue::Null),
            ("Extra", "".into()),
        ]));

        assert_eq!(column.field, "title");
        assert_eq!(column.portable_type.as_deref(), Some("string"));
        assert!(!column.nullable);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_sqlite_column_normalization() {
        let manager = SqlSchemaManager::new(create_platform(DatabaseBackend::SQLite));
        let column = manager.column_from_row(&row(&[
            ("cid", 0.into()),
            ("name", "uid".into()),
            ("type", "INTEGER".into()),
            ("notnull", 0.into()),
            ("dflt_value", SqlValue::Null),
            ("pk", 1.into()),
        ]));

        assert_eq!(column.field, "uid");
        assert_eq!(column.key, "PRI");
        assert!(column.nullable);
        assert_eq!(column.portable_type.as_deref(), Some("integer"));
    }

    #[test]
    fn test_sqlite_primary_index_is_named_primary() {
        let manager = SqlSchemaManager::new(create_platform(DatabaseBackend::SQLite));
        let index = manager.index_from_row(
            &row(&[
                ("key_name", "sqlite_autoindex_pages_1".into()),
                ("column_name", "slug".into()),
                ("seqno", 0.into()),
                ("is_unique", 1.into()),
                ("origin", "pk".into()),
            ]),
            "pages",
        );

        assert_eq!(index.key_name, "PRIMARY");
        assert!(!index.non_unique);
        assert_eq!(index.seq_in_index, 1);
        assert_eq!(index.table, "pages");
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let r = row(&[("DATABASE", "cms".into())]);
        assert_eq!(text(&r, "Database"), "cms");
        assert_eq!(int(&r, "missing"), 0);
    }
}
