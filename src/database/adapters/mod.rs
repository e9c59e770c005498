//! sqlx-backed driver
//!
//! Each [`DatabaseConnection`](crate::database::connection::DatabaseConnection)
//! gets one sqlx connection (no pool) driven by a private current-thread
//! tokio runtime, so every call blocks until the server answers. Calling
//! into this driver from inside another tokio runtime is not supported.

use crate::database::config::ConnectionConfig;
use crate::database::driver::{Driver, DriverConnection};
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::error::{codes, Error, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::runtime::Runtime;

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

/// Driver opening sqlx connections for every supported backend
#[derive(Default)]
pub struct SqlxDriver {
    runtime: OnceCell<Arc<Runtime>>,
}

impl SqlxDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn runtime(&self) -> Result<Arc<Runtime>> {
        self.runtime
            .get_or_try_init(|| {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map(Arc::new)
            })
            .cloned()
            .map_err(Error::from)
    }
}

impl Driver for SqlxDriver {
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DriverConnection>> {
        if config.persistent {
            log::warn!("Persistent connections are not supported by the sqlx driver; opening a regular connection");
        }
        if config.compression {
            log::warn!("Protocol compression is not supported by the sqlx driver; ignoring");
        }

        let runtime = self.runtime()?;
        log::debug!(
            "Connecting to {} database '{}' at {}",
            config.driver,
            config.database_name,
            config.endpoint()
        );

        match config.driver {
            DatabaseBackend::MySQL | DatabaseBackend::MariaDB => {
                Ok(Box::new(MySqlAdapter::connect(runtime, config)?))
            }
            DatabaseBackend::Postgres => Ok(Box::new(PostgresAdapter::connect(runtime, config)?)),
            DatabaseBackend::SQLite => Ok(Box::new(SqliteAdapter::connect(runtime, config)?)),
        }
    }
}

/// Last error reported by an adapter
#[derive(Debug, Default)]
pub(crate) struct ErrorState {
    code: i64,
    message: String,
}

impl ErrorState {
    /// Remember the error and turn it into a query error
    pub(crate) fn record(&mut self, code: i64, message: String) -> Error {
        self.code = code;
        self.message = message.clone();
        Error::query(message, code)
    }

    pub(crate) fn clear(&mut self) {
        self.code = 0;
        self.message.clear();
    }

    pub(crate) fn code(&self) -> i64 {
        self.code
    }

    pub(crate) fn message(&self) -> String {
        self.message.clone()
    }
}

pub(crate) fn closed_error() -> Error {
    Error::connection("Connection is closed", codes::CONNECTION_CLOSED)
}

/// Decode a column without type checks, as text first and then as raw bytes
pub(crate) fn untyped_value<R>(row: &R, index: usize) -> SqlValue
where
    R: sqlx::Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> String: sqlx::Decode<'r, R::Database>,
    for<'r> Vec<u8>: sqlx::Decode<'r, R::Database>,
{
    if let Ok(text) = row.try_get_unchecked::<String, _>(index) {
        return SqlValue::String(text);
    }
    row.try_get_unchecked::<Vec<u8>, _>(index)
        .map(SqlValue::Bytes)
        .unwrap_or(SqlValue::Null)
}

/// Integers that fit are reported as `Int`, wider ones as `BigInt`
pub(crate) fn integer_value(value: i64) -> SqlValue {
    i32::try_from(value)
        .map(SqlValue::Int)
        .unwrap_or(SqlValue::BigInt(value))
}
