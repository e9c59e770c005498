//! Connection core and the driver boundary it wraps
//!
//! This module holds the single-connection core, the driver traits it is a
//! client of, the sqlx-backed driver, backend platforms, schema
//! introspection, the quoting subsystem and query observers.

pub mod adapters;
pub mod config;
pub mod connection;
pub mod driver;
pub mod hooks;
pub mod platforms;
pub mod quoting;
pub mod schema;
pub mod types;

// Re-export main types for convenience
pub use adapters::{MySqlAdapter, PostgresAdapter, SqliteAdapter, SqlxDriver};
pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::DatabaseConnection;
pub use driver::{BufferedStatement, Driver, DriverConnection, Row, Statement};
pub use hooks::{ObserverRegistry, QueryObserver};
pub use platforms::{create_platform, Platform};
pub use quoting::Quoter;
pub use schema::{ColumnInfo, IndexInfo, SchemaManager, SqlSchemaManager, TableInfo};
pub use types::{DatabaseBackend, SqlValue};
