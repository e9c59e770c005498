//! dbal - database abstraction layer
//!
//! dbal sits between application code and a relational database driver and
//! provides:
//! - A fluent query-object API (SELECT/INSERT/UPDATE/DELETE/TRUNCATE)
//! - An expression builder for WHERE/HAVING fragments
//! - A single-connection core that owns configuration and connection state
//! - A legacy procedural facade for code written against the older API
//!
//! ```no_run
//! use dbal::{ConnectionConfig, DatabaseBackend, DatabaseConnection};
//!
//! let config = ConnectionConfig::builder()
//!     .driver(DatabaseBackend::SQLite)
//!     .database_name(":memory:")
//!     .build();
//! let mut db = DatabaseConnection::new(config);
//! db.query("CREATE TABLE pages (uid INTEGER PRIMARY KEY, title TEXT)")?;
//!
//! let sql = db
//!     .create_select_query()?
//!     .select(["uid", "title"])
//!     .from(["pages"])
//!     .order_by("uid", "DESC")?
//!     .limit(10, 0)
//!     .get_sql()?;
//! assert_eq!(sql, "SELECT uid, title FROM pages ORDER BY uid DESC LIMIT 10");
//! # Ok::<(), dbal::Error>(())
//! ```

// Error handling lints
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod database;
pub mod error;
pub mod legacy;
pub mod query;

pub use database::config::{ConnectionConfig, ConnectionConfigBuilder};
pub use database::connection::DatabaseConnection;
pub use database::driver::{Driver, DriverConnection, Row, Statement};
pub use database::hooks::QueryObserver;
pub use database::types::{DatabaseBackend, SqlValue};
pub use error::{Error, Result};
pub use legacy::LegacyConnection;
pub use query::{
    DeleteQuery, Expression, ExpressionBuilder, InsertQuery, OrderDirection, PreparedStatement,
    SelectQuery, TruncateQuery, UpdateQuery,
};
