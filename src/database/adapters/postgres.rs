//! PostgreSQL adapter

use super::{closed_error, untyped_value, ErrorState};
use crate::database::config::ConnectionConfig;
use crate::database::driver::{returns_rows, BufferedStatement, DriverConnection, Row, Statement};
use crate::database::platforms::{create_platform, Platform};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo, ValueRef};
use std::sync::Arc;
use tokio::runtime::Runtime;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// Blocking PostgreSQL connection
pub struct PostgresAdapter {
    runtime: Arc<Runtime>,
    conn: Option<PgConnection>,
    platform: Arc<dyn Platform>,
    errors: ErrorState,
}

impl PostgresAdapter {
    pub fn connect(runtime: Arc<Runtime>, config: &ConnectionConfig) -> Result<Self> {
        let options = Self::connect_options(config)?;
        let conn = runtime.block_on(PgConnection::connect_with(&options)).map_err(|e| {
            let (code, message) = error_parts(&e);
            Error::query(message, code)
        })?;

        Ok(Self {
            runtime,
            conn: Some(conn),
            platform: create_platform(config.driver),
            errors: ErrorState::default(),
        })
    }

    fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username);

        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        if !config.database_name.is_empty() {
            options = options.database(&config.database_name);
        }
        if let Some(socket) = config.socket.as_deref().filter(|s| !s.is_empty()) {
            options = options.socket(socket);
        }
        if let Some(mode) = &config.ssl_mode {
            let mode: PgSslMode = mode.parse().map_err(|e| {
                Error::config(format!("Invalid PostgreSQL ssl_mode '{}': {}", mode, e))
            })?;
            options = options.ssl_mode(mode);
        }
        if !config.charset.is_empty() {
            options = options.options([("client_encoding", normalize_charset(&config.charset))]);
        }
        Ok(options)
    }

    fn run(&mut self, sql: &str, query: Option<PgQuery<'_>>) -> Result<Box<dyn Statement>> {
        let conn = self.conn.as_mut().ok_or_else(closed_error)?;
        let wants_rows = returns_rows(sql);

        let outcome = self.runtime.block_on(async {
            match (query, wants_rows) {
                (Some(query), true) => query.fetch_all(&mut *conn).await.map(|rows| (Some(rows), 0)),
                (Some(query), false) => query
                    .execute(&mut *conn)
                    .await
                    .map(|done| (None, done.rows_affected())),
                (None, true) => (&mut *conn).fetch_all(sql).await.map(|rows| (Some(rows), 0)),
                (None, false) => (&mut *conn)
                    .execute(sql)
                    .await
                    .map(|done| (None, done.rows_affected())),
            }
        });

        match outcome {
            Ok((Some(rows), _)) => {
                self.errors.clear();
                let rows = rows.iter().map(convert_row).collect();
                Ok(Box::new(BufferedStatement::with_rows(rows)))
            }
            Ok((None, affected)) => {
                self.errors.clear();
                Ok(Box::new(BufferedStatement::with_affected(affected)))
            }
            Err(e) => {
                let (code, message) = error_parts(&e);
                log::debug!("PostgreSQL statement failed ({}): {}", code, message);
                Err(self.errors.record(code, message))
            }
        }
    }
}

impl DriverConnection for PostgresAdapter {
    fn query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        #[cfg(debug_assertions)]
        log::debug!("PostgreSQL QUERY: {}", sql);

        self.run(sql, None)
    }

    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn Statement>> {
        #[cfg(debug_assertions)]
        {
            log::debug!("PostgreSQL EXECUTE: {}", sql);
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

    // lastval() fails until a sequence was used in this session
    fn last_insert_id(&mut self) -> i64 {
        let Some(conn) = self.conn.as_mut() else {
            return 0;
        };
        self.runtime
            .block_on(sqlx::query_scalar::<_, i64>("SELECT lastval()").fetch_one(&mut *conn))
            .unwrap_or(0)
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.runtime.block_on(conn.close()) {
                log::debug!("PostgreSQL close failed: {}", e);
            }
        }
    }

    fn platform(&self) -> Arc<dyn Platform> {
        self.platform.clone()
    }
}

/// MySQL-style charset names mapped onto PostgreSQL encodings
fn normalize_charset(charset: &str) -> String {
    match charset.to_lowercase().as_str() {
        "utf8" | "utf8mb4" | "utf-8" => "UTF8".to_string(),
        "latin1" => "LATIN1".to_string(),
        other => other.to_uppercase(),
    }
}

// SQLSTATE codes are only numeric for some classes
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

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| (column.name().to_string(), column_value(row, index)))
        .collect()
}

fn column_value(row: &PgRow, index: usize) -> SqlValue {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    let typed = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).ok().map(SqlValue::Bool),
        "INT2" => row.try_get::<i16, _>(index).ok().map(|i| SqlValue::Int(i.into())),
        "INT4" => row.try_get::<i32, _>(index).ok().map(SqlValue::Int),
        "INT8" => row.try_get::<i64, _>(index).ok().map(SqlValue::BigInt),
        "FLOAT4" => row.try_get::<f32, _>(index).ok().map(|f| SqlValue::Double(f.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).ok().map(SqlValue::Double),
        "NUMERIC" => row
            .try_get::<rust_decimal::Decimal, _>(index)
            .ok()
            .map(SqlValue::Decimal),
        "DATE" => row.try_get::<NaiveDate, _>(index).ok().map(SqlValue::from),
        "TIME" => row.try_get::<NaiveTime, _>(index).ok().map(SqlValue::from),
        "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(index).ok().map(SqlValue::from),
        "TIMESTAMPTZ" => row.try_get::<DateTime<Utc>, _>(index).ok().map(SqlValue::from),
        "UUID" => row.try_get::<uuid::Uuid, _>(index).ok().map(SqlValue::from),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index).ok().map(SqlValue::Json),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).ok().map(SqlValue::Bytes),
        _ => row.try_get::<String, _>(index).ok().map(SqlValue::String),
    };

    typed.unwrap_or_else(|| untyped_value(row, index))
}

/// Bind a SqlValue to a PostgreSQL query
fn bind_param(query: PgQuery<'_>, value: SqlValue) -> PgQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::BigInt(i) => query.bind(i),
        SqlValue::UnsignedBigInt(i) => match i64::try_from(i) {
            Ok(i) => query.bind(i),
            Err(_) => query.bind(rust_decimal::Decimal::from(i)),
        },
        SqlValue::Double(f) => query.bind(f),
        SqlValue::Decimal(d) => query.bind(d),
        SqlValue::String(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Json(j) => query.bind(j),
        SqlValue::Uuid(s) => match uuid::Uuid::parse_str(&s) {
            Ok(uuid) => query.bind(uuid),
            Err(_) => query.bind(s),
        },
        SqlValue::Date(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(date) => query.bind(date),
            Err(_) => query.bind(s),
        },
        SqlValue::Time(s) => match NaiveTime::parse_from_str(&s, "%H:%M:%S") {
            Ok(time) => query.bind(time),
            Err(_) => query.bind(s),
        },
        SqlValue::DateTime(s) => match NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S") {
            Ok(dt) => query.bind(dt),
            Err(_) => query.bind(s),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::types::DatabaseBackend;

    #[test]
    fn test_charset_normalization() {
        assert_eq!(normalize_charset("utf8"), "UTF8");
        assert_eq!(normalize_charset("utf8mb4"), "UTF8");
        assert_eq!(normalize_charset("win1252"), "WIN1252");
    }

    #[test]
    fn test_connect_options() {
        let config = ConnectionConfig::builder()
            .driver(DatabaseBackend::Postgres)
            .host("db")
            .database_name("cms")
            .ssl_mode("require")
            .build();
        assert!(PostgresAdapter::connect_options(&config).is_ok());

        let config = ConnectionConfig::builder()
            .driver(DatabaseBackend::Postgres)
            .ssl_mode("always")
            .build();
        assert!(matches!(
            PostgresAdapter::connect_options(&config),
            Err(Error::Config(_))
        ));
    }
}
