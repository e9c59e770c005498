//! Unified type system for database operations
//!
//! This module provides the backend identifier and the value type shared by
//! the driver boundary, the quoting subsystem and the query objects.

pub mod value;

pub use value::SqlValue;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database backends understood by the platforms and the sqlx driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Postgres,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "mariadb")]
    MariaDB,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl DatabaseBackend {
    /// MySQL and MariaDB share dialect, quoting and session handling
    pub fn is_mysql_family(&self) -> bool {
        matches!(self, DatabaseBackend::MySQL | DatabaseBackend::MariaDB)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::MySQL => "mysql",
            DatabaseBackend::MariaDB => "mariadb",
            DatabaseBackend::SQLite => "sqlite",
        }
    }

    /// Port the server listens on unless configured otherwise
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseBackend::Postgres => 5432,
            DatabaseBackend::MySQL | DatabaseBackend::MariaDB => 3306,
            DatabaseBackend::SQLite => 0,
        }
    }
}

impl Default for DatabaseBackend {
    fn default() -> Self {
        DatabaseBackend::MySQL
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseBackend {
    type Err = Error;

    /// Accepts the driver names older configuration files used
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mysqli" | "pdo_mysql" => Ok(DatabaseBackend::MySQL),
            "mariadb" => Ok(DatabaseBackend::MariaDB),
            "postgres" | "postgresql" | "pgsql" | "pdo_pgsql" => Ok(DatabaseBackend::Postgres),
            "sqlite" | "sqlite3" | "pdo_sqlite" => Ok(DatabaseBackend::SQLite),
            other => Err(Error::config(format!("Unsupported database driver: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_aliases() {
        assert_eq!("mysqli".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::MySQL);
        assert_eq!("pdo_pgsql".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::Postgres);
        assert_eq!("SQLite3".parse::<DatabaseBackend>().unwrap(), DatabaseBackend::SQLite);
        assert!("oracle".parse::<DatabaseBackend>().is_err());
    }

    #[test]
    fn test_mysql_family() {
        assert!(DatabaseBackend::MariaDB.is_mysql_family());
        assert!(!DatabaseBackend::SQLite.is_mysql_family());
        assert_eq!(DatabaseBackend::Postgres.default_port(), 5432);
    }
}
