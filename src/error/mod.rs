use thiserror::Error;

pub mod logging;

pub type Result<T> = std::result::Result<T, Error>;

// Re-export logging types for easy access
pub use logging::{LogCrateSink, LogEntry, LogLevel, LogSink, MemoryLogSink};

/// Fixed numeric codes for programmatic matching of thrown errors
pub mod codes {
    /// `connect()` was called without a database name outside the installer
    pub const NO_DATABASE_SELECTED: u32 = 1270853882;
    /// The server refused the connection or the liveness probe failed
    pub const CONNECTION_REJECTED: u32 = 1270853884;
    /// An operation needed a live handle but the connection is closed
    pub const CONNECTION_CLOSED: u32 = 1270853885;

    pub const INVALID_ORDER_DIRECTION: u32 = 1459268911;
    pub const EMPTY_CONSTRAINT_LIST: u32 = 1459268912;
    pub const EMPTY_WHERE_CLAUSE: u32 = 1459268913;
    pub const MISMATCHED_VALUES: u32 = 1459268914;
    pub const INVALID_LIST_VALUE: u32 = 1294585862;
    pub const UNKNOWN_PARAMETER: u32 = 1459268915;
    pub const INVALID_LIMIT: u32 = 1459268916;
    pub const MISSING_INDEX_FIELD: u32 = 1459268917;

    pub const MISSING_SELECT: u32 = 1459269001;
    pub const MISSING_FROM: u32 = 1459269002;
    pub const MISSING_TABLE: u32 = 1459269003;
    pub const MISSING_VALUES: u32 = 1459269004;
}

/// Main error type for dbal
#[derive(Error, Debug)]
pub enum Error {
    /// Fatal: configuration incomplete or the server rejected us
    #[error("Database connection error: {message}")]
    Connection { message: String, code: u32 },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String, code: u32 },

    /// A query object was rendered without its required parts
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String, code: u32 },

    /// The driver or server rejected a statement
    #[error("Database query error ({errno}): {message}")]
    Query { message: String, errno: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn connection(msg: impl Into<String>, code: u32) -> Self {
        Self::Connection {
            message: msg.into(),
            code,
        }
    }

    pub fn invalid_argument(msg: impl Into<String>, code: u32) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
            code,
        }
    }

    pub fn invalid_query(msg: impl Into<String>, code: u32) -> Self {
        Self::InvalidQuery {
            message: msg.into(),
            code,
        }
    }

    pub fn query(msg: impl Into<String>, errno: i64) -> Self {
        Self::Query {
            message: msg.into(),
            errno,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Fixed numeric code, if this error carries one
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::Connection { code, .. }
            | Error::InvalidArgument { code, .. }
            | Error::InvalidQuery { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Fatal errors end the request; nothing in this crate retries them
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Programmer errors, as opposed to runtime failures
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument { .. } | Error::InvalidQuery { .. }
        )
    }

    /// Get error code for logs and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Connection { .. } => "E_DB_CONNECTION",
            Error::InvalidArgument { .. } => "E_INVALID_ARGUMENT",
            Error::InvalidQuery { .. } => "E_INVALID_QUERY",
            Error::Query { .. } => "E_DB_QUERY",
            Error::Config(_) => "E_CONFIG",
            Error::Io(_) => "E_IO",
        }
    }
}
