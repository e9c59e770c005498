//! MySQL/MariaDB adapter

use super::{closed_error, untyped_value, ErrorState};
use crate::database::config::ConnectionConfig;
use crate::database::driver::{returns_rows, BufferedStatement, DriverConnection, Row, Statement};
use crate::database::platforms::{create_platform, Platform};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow, MySqlSslMode};
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo, ValueRef};
use std::sync::Arc;
use tokio::runtime::Runtime;

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>;

/// Blocking MySQL connection
pub struct MySqlAdapter {
    runtime: Arc<Runtime>,
    conn: Option<MySqlConnection>,
    platform: Arc<dyn Platform>,
    errors: ErrorState,
    last_insert_id: i64,
}

impl MySqlAdapter {
    pub fn connect(runtime: Arc<Runtime>, config: &ConnectionConfig) -> Result<Self> {
        let options = Self::connect_options(config)?;
        let conn = runtime.block_on(MySqlConnection::connect_with(&options)).map_err(|e| {
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

    fn connect_options(config: &ConnectionConfig) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .charset(&config.charset);

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
            let mode: MySqlSslMode = mode
                .parse()
                .map_err(|e| Error::config(format!("Invalid MySQL ssl_mode '{}': {}", mode, e)))?;
            options = options.ssl_mode(mode);
        }
        Ok(options)
    }

    fn run(&mut self, sql: &str, query: Option<MySqlQuery<'_>>) -> Result<Box<dyn Statement>> {
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
                    .map(|done| (None, done.rows_affected(), done.last_insert_id())),
                (None, true) => (&mut *conn)
                    .fetch_all(sql)
                    .await
                    .map(|rows| (Some(rows), 0, 0)),
                (None, false) => (&mut *conn)
                    .execute(sql)
                    .await
                    .map(|done| (None, done.rows_affected(), done.last_insert_id())),
            }
        });

        match outcome {
            Ok((Some(rows), _, _)) => {
                self.errors.clear();
                let rows = rows.iter().map(convert_row).collect();
                Ok(Box::new(BufferedStatement::with_rows(rows)))
            }
            Ok((None, affected, insert_id)) => {
                self.errors.clear();
                if insert_id > 0 {
                    self.last_insert_id = insert_id as i64;
                }
                Ok(Box::new(BufferedStatement::with_affected(affected)))
            }
            Err(e) => {
                let (code, message) = error_parts(&e);
                log::debug!("MySQL statement failed ({}): {}", code, message);
                Err(self.errors.record(code, message))
            }
        }
    }
}

impl DriverConnection for MySqlAdapter {
    fn query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        #[cfg(debug_assertions)]
        log::debug!("MySQL QUERY: {}", sql);

        self.run(sql, None)
    }

    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn Statement>> {
        #[cfg(debug_assertions)]
        {
            log::debug!("MySQL EXECUTE: {}", sql);
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
                log::debug!("MySQL close failed: {}", e);
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
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| i64::from(e.number()))
                .unwrap_or(-1);
            (code, db.message().to_string())
        }
        other => (-1, other.to_string()),
    }
}

fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| (column.name().to_string(), column_value(row, index)))
        .collect()
}

fn column_value(row: &MySqlRow, index: usize) -> SqlValue {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    let typed = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(index).ok().map(SqlValue::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).ok().map(super::integer_value)
        }
        "YEAR" => row.try_get::<u16, _>(index).ok().map(|y| SqlValue::Int(y.into())),
        name if name.ends_with("UNSIGNED") => {
            row.try_get::<u64, _>(index).ok().map(SqlValue::UnsignedBigInt)
        }
        "FLOAT" => row.try_get::<f32, _>(index).ok().map(|f| SqlValue::Double(f.into())),
        "DOUBLE" => row.try_get::<f64, _>(index).ok().map(SqlValue::Double),
        "DECIMAL" => row
            .try_get::<rust_decimal::Decimal, _>(index)
            .ok()
            .map(SqlValue::Decimal),
        "DATE" => row.try_get::<NaiveDate, _>(index).ok().map(SqlValue::from),
        "TIME" => row.try_get::<NaiveTime, _>(index).ok().map(SqlValue::from),
        "DATETIME" | "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(index).ok().map(SqlValue::from),
        "JSON" => row.try_get::<JsonValue, _>(index).ok().map(SqlValue::Json),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            row.try_get::<Vec<u8>, _>(index).ok().map(SqlValue::Bytes)
        }
        _ => row.try_get::<String, _>(index).ok().map(SqlValue::String),
    };

    typed.unwrap_or_else(|| untyped_value(row, index))
}

/// Bind a SqlValue to a MySQL query
fn bind_param(query: MySqlQuery<'_>, value: SqlValue) -> MySqlQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<Vec<u8>>),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::BigInt(i) => query.bind(i),
        SqlValue::UnsignedBigInt(i) => query.bind(i),
        SqlValue::Double(f) => query.bind(f),
        SqlValue::Decimal(d) => query.bind(d),
        SqlValue::String(s) | SqlValue::Uuid(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Json(j) => query.bind(j),
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
