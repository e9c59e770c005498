//! SQLite adapter

use super::{closed_error, integer_value, untyped_value, ErrorState};
use crate::database::config::ConnectionConfig;
use crate::database::driver::{returns_rows, BufferedStatement, DriverConnection, Row, Statement};
use crate::database::platforms::{create_platform, Platform};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Runtime;

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

/// Database name that opens a private in-memory database
pub const MEMORY_DATABASE: &str = ":memory:";

/// Blocking SQLite connection
pub struct SqliteAdapter {
    runtime: Arc<Runtime>,
    conn: Option<SqliteConnection>,
    platform: Arc<dyn Platform>,
    errors: ErrorState,
    last_insert_id: i64,
}

impl SqliteAdapter {
    pub fn connect(runtime: Arc<Runtime>, config: &ConnectionConfig) -> Result<Self> {
        let options = Self::connect_options(config)?;
        let conn = runtime
            .block_on(SqliteConnection::connect_with(&options))
            .map_err(|e| {
                let (code, message) = error_parts(&e);
                Error::query(message, code)
            })?;

        Ok(Self {
            runtime,
            conn: Some(conn),
            platform: create_platform(config.driver),
            errors: ErrorState::default(),
            last_insert_id: 0,
        })
    }

    fn connect_options(config: &ConnectionConfig) -> Result<SqliteConnectOptions> {
        let name = config.database_name.as_str();
        if name.is_empty() || name == MEMORY_DATABASE {
            return SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| Error::config(format!("Invalid SQLite options: {}", e)));
        }
        Ok(SqliteConnectOptions::new()
            .filename(name)
            .create_if_missing(true))
    }

    fn run(&mut self, sql: &str, query: Option<SqliteQuery<'_>>) -> Result<Box<dyn Statement>> {
        let conn = self.conn.as_mut().ok_or_else(closed_error)?;
        let wants_rows = returns_rows(sql);

        let outcome = self.runtime.block_on(async {
            match (query, wants_rows) {
                (Some(query), true) => query
                    .fetch_all(&mut *conn)
                    .await
                    .map(|rows| (Some(rows), 0, 0)),
                (Some(query), false) => query
                    .execute(&mut *conn)
                    .await
                    .map(|done| (None, done.rows_affected(), done.last_insert_rowid())),
                (None, true) => (&mut *conn)
                    .fetch_all(sql)
                    .await
                    .map(|rows| (Some(rows), 0, 0)),
                (None, false) => (&mut *conn)
                    .execute(sql)
                    .await
                    .map(|done| (None, done.rows_affected(), done.last_insert_rowid())),
            }
        });

        match outcome {
            Ok((Some(rows), _, _)) => {
                self.errors.clear();
                let rows = rows.iter().map(convert_row).collect();
                Ok(Box::new(BufferedStatement::with_rows(rows)))
            }
            Ok((None, affected, rowid)) => {
                self.errors.clear();
                if rowid > 0 {
                    self.last_insert_id = rowid;
                }
                Ok(Box::new(BufferedStatement::with_affected(affected)))
            }
            Err(e) => {
                let (code, message) = error_parts(&e);
                log::debug!("SQLite statement failed ({}): {}", code, message);
                Err(self.errors.record(code, message))
            }
        }
    }
}

impl DriverConnection for SqliteAdapter {
    fn query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        #[cfg(debug_assertions)]
        log::debug!("SQLite QUERY: {}", sql);

        self.run(sql, None)
    }

    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn Statement>> {
        #[cfg(debug_assertions)]
        {
            log::debug!("SQLite EXECUTE: {}", sql);
            log::debug!("  Parameters: {:?}", params);
        }

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param.clone());
        }
        self.run(sql, Some(query))
    }

    fn error_code(&self) -> i64 {
        self.errors.code()
    }

    fn error_message(&self) -> String {
        self.errors.message()
    }

    fn last_insert_id(&mut self) -> i64 {
        self.last_insert_id
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.runtime.block_on(conn.close()) {
                log::debug!("SQLite close failed: {}", e);
            }
        }
    }

    fn platform(&self) -> Arc<dyn Platform> {
        self.platform.clone()
    }
}

fn error_parts(err: &sqlx::Error) -> (i64, String) {
    match err {
        sqlx::Error::Database(db) => {
            let code = db
                .code()
                .and_then(|c| c.parse::<i64>().ok())
                .unwrap_or(-1);
            (code, db.message().to_string())
        }
        other => (-1, other.to_string()),
    }
}

fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| (column.name().to_string(), column_value(row, index)))
        .collect()
}

// SQLite reports the storage class of each value, not the declared type
fn column_value(row: &SqliteRow, index: usize) -> SqlValue {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    let typed = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).ok().map(integer_value),
        "REAL" => row.try_get::<f64, _>(index).ok().map(SqlValue::Double),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).ok().map(SqlValue::Bytes),
        _ => row.try_get::<String, _>(index).ok().map(SqlValue::String),
    };

    typed.unwrap_or_else(|| untyped_value(row, index))
}

/// Bind a SqlValue to a SQLite query
fn bind_param(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<i32>),
        SqlValue::Bool(b) => query.bind(i32::from(b)),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::BigInt(i) => query.bind(i),
        // SQLite INTEGER is a signed 8-byte value
        SqlValue::UnsignedBigInt(i) => match i64::try_from(i) {
            Ok(i) => query.bind(i),
            Err(_) => query.bind(i.to_string()),
        },
        SqlValue::Double(f) => query.bind(f),
        SqlValue::Decimal(d) => query.bind(d.to_string()),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Json(j) => query.bind(j.to_string()),
        SqlValue::String(s)
        | SqlValue::Uuid(s)
        | SqlValue::Date(s)
        | SqlValue::Time(s)
        | SqlValue::DateTime(s) => query.bind(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::types::DatabaseBackend;

    fn adapter() -> SqliteAdapter {
        let runtime = Arc::new(
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap(),
        );
        let config = ConnectionConfig::builder()
            .driver(DatabaseBackend::SQLite)
            .database_name(MEMORY_DATABASE)
            .build();
        SqliteAdapter::connect(runtime, &config).unwrap()
    }

    #[test]
    fn test_query_and_fetch() {
        let mut adapter = adapter();
        adapter
            .query("CREATE TABLE pages (uid INTEGER PRIMARY KEY, title TEXT, score REAL, data BLOB)")
            .unwrap();

        let stmt = adapter
            .execute_prepared(
                "INSERT INTO pages (title, score, data) VALUES (?, ?, ?)",
                &[SqlValue::from("Home"), SqlValue::from(1.5), SqlValue::Null],
            )
            .unwrap();
        assert_eq!(stmt.row_count(), 1);
        assert_eq!(adapter.last_insert_id(), 1);

        let mut stmt = adapter.query("SELECT uid, title, score, data FROM pages").unwrap();
        let row = stmt.fetch().unwrap();
        assert_eq!(row["uid"], SqlValue::Int(1));
        assert_eq!(row["title"], SqlValue::from("Home"));
        assert_eq!(row["score"], SqlValue::Double(1.5));
        assert_eq!(row["data"], SqlValue::Null);
    }

    #[test]
    fn test_errors_are_recorded() {
        let mut adapter = adapter();
        let err = adapter.query("SELECT * FROM missing_table").err().unwrap();
        assert!(matches!(err, Error::Query { .. }));
        assert!(adapter.error_message().contains("missing_table"));

        adapter.query("SELECT 1").unwrap();
        assert_eq!(adapter.error_code(), 0);
        assert!(adapter.error_message().is_empty());
    }

    #[test]
    fn test_close() {
        let mut adapter = adapter();
        adapter.close();
        assert!(!adapter.is_connected());
        assert!(matches!(
            adapter.query("SELECT 1"),
            Err(Error::Connection { .. })
        ));
    }
}
