//! Connection core
//!
//! [`DatabaseConnection`] owns the connection configuration and the state of
//! one driver connection. It connects lazily, drops the connection whenever
//! a setter changes anything the live connection depends on, dispatches raw
//! statements, and hands out freshly allocated query objects bound to itself.
//!
//! Connection failures are fatal and returned as [`Error::Connection`].
//! Fetching from a dead statement handle is not: it is reported to the
//! [`LogSink`] and the call returns `None`/`false`.

use crate::database::adapters::SqlxDriver;
use crate::database::config::ConnectionConfig;
use crate::database::driver::{Driver, DriverConnection, Row, Statement};
use crate::database::platforms::Platform;
use crate::database::quoting::Quoter;
use crate::database::schema::{ColumnInfo, IndexInfo, SchemaManager, TableInfo};
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::error::{codes, Error, LogCrateSink, LogEntry, LogLevel, LogSink, Result};
use crate::query::{
    DeleteQuery, InsertQuery, PreparedStatement, SelectQuery, TruncateQuery, UpdateQuery,
};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// SQL mode that breaks the backslash escaping of the MySQL platform
const NO_BACKSLASH_ESCAPES: &str = "NO_BACKSLASH_ESCAPES";

/// Single-connection database core
pub struct DatabaseConnection {
    config: ConnectionConfig,
    driver: Arc<dyn Driver>,
    handle: Option<Box<dyn DriverConnection>>,
    platform: Option<Arc<dyn Platform>>,
    schema_manager: Option<Arc<dyn SchemaManager>>,
    affected_rows: u64,
    debug_last_built_query: String,
    debug_output: bool,
    store_last_built_query: bool,
    initial_installation_in_progress: bool,
    logger: Arc<dyn LogSink>,
}

impl DatabaseConnection {
    /// Create a disconnected core using the sqlx driver
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_driver(config, Arc::new(SqlxDriver::new()))
    }

    /// Create a disconnected core using a custom driver
    pub fn with_driver(config: ConnectionConfig, driver: Arc<dyn Driver>) -> Self {
        Self {
            config,
            driver,
            handle: None,
            platform: None,
            schema_manager: None,
            affected_rows: 0,
            debug_last_built_query: String::new(),
            debug_output: false,
            store_last_built_query: false,
            initial_installation_in_progress: false,
            logger: Arc::new(LogCrateSink),
        }
    }

    pub fn set_logger(&mut self, logger: Arc<dyn LogSink>) {
        self.logger = logger;
    }

    pub fn logger(&self) -> &Arc<dyn LogSink> {
        &self.logger
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Configuration setters; each drops a live connection first
    // ---------------------------------------------------------------------

    pub fn set_database_host(&mut self, host: impl Into<String>) {
        self.disconnect_if_connected();
        self.config.host = host.into();
    }

    pub fn set_database_port(&mut self, port: u16) {
        self.disconnect_if_connected();
        self.config.port = port;
    }

    /// Set the socket path; an empty path clears it
    pub fn set_database_socket(&mut self, socket: impl Into<String>) {
        self.disconnect_if_connected();
        let socket = socket.into();
        self.config.socket = if socket.is_empty() { None } else { Some(socket) };
    }

    pub fn set_database_name(&mut self, name: impl Into<String>) {
        self.disconnect_if_connected();
        self.config.database_name = name.into();
    }

    pub fn set_database_username(&mut self, username: impl Into<String>) {
        self.disconnect_if_connected();
        self.config.username = username.into();
    }

    pub fn set_database_password(&mut self, password: impl Into<String>) {
        self.disconnect_if_connected();
        self.config.password = password.into();
    }

    pub fn set_database_driver(&mut self, driver: DatabaseBackend) {
        self.disconnect_if_connected();
        self.config.driver = driver;
    }

    pub fn set_connection_charset(&mut self, charset: impl Into<String>) {
        self.disconnect_if_connected();
        self.config.charset = charset.into();
    }

    pub fn set_ssl_mode(&mut self, mode: Option<String>) {
        self.disconnect_if_connected();
        self.config.ssl_mode = mode;
    }

    pub fn set_persistent_database_connection(&mut self, persistent: bool) {
        self.disconnect_if_connected();
        self.config.persistent = persistent;
    }

    pub fn set_connection_compression(&mut self, compression: bool) {
        self.disconnect_if_connected();
        self.config.compression = compression;
    }

    pub fn set_initialize_commands_after_connect(&mut self, commands: Vec<String>) {
        self.disconnect_if_connected();
        self.config.post_connect_commands = commands;
    }

    pub fn database_name(&self) -> &str {
        &self.config.database_name
    }

    /// Allow connecting without a database name (installer bootstrap)
    pub fn set_initial_installation_in_progress(&mut self, in_progress: bool) {
        self.initial_installation_in_progress = in_progress;
    }

    pub fn set_debug_output(&mut self, enabled: bool) {
        self.debug_output = enabled;
    }

    pub fn debug_output(&self) -> bool {
        self.debug_output
    }

    pub fn set_store_last_built_query(&mut self, enabled: bool) {
        self.store_last_built_query = enabled;
    }

    /// Last statement recorded while debug output or query storing is on
    pub fn last_built_query(&self) -> &str {
        &self.debug_last_built_query
    }

    /// Remember a built statement when debug output or query storing is on
    pub fn record_built_query(&mut self, sql: &str) {
        if self.debug_output || self.store_last_built_query {
            self.debug_last_built_query = sql.to_string();
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Open the connection; a no-op when already connected
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        if self.config.database_name.is_empty() && !self.initial_installation_in_progress {
            return Err(Error::connection(
                "The current database name is not set. Check the database configuration.",
                codes::NO_DATABASE_SELECTED,
            ));
        }

        // A handle that lost its server is never reused
        if let Some(mut stale) = self.handle.take() {
            stale.close();
        }
        self.platform = None;
        self.schema_manager = None;
        self.affected_rows = 0;

        let mut handle = match self.driver.connect(&self.config) {
            Ok(handle) => handle,
            Err(e) => return Err(self.connection_rejected(&e.to_string())),
        };

        let platform = handle.platform();
        platform.register_type_mapping("enum", "string");

        match handle.query(&platform.dummy_select_sql()) {
            Ok(mut stmt) => stmt.close_cursor(),
            Err(e) => {
                handle.close();
                return Err(self.connection_rejected(&e.to_string()));
            }
        }

        self.schema_manager = Some(handle.schema_manager());
        self.platform = Some(platform);
        self.handle = Some(handle);

        log::debug!(
            "Connected to {} database '{}' at {}",
            self.config.driver,
            self.config.database_name,
            self.config.endpoint()
        );

        self.run_post_connect_commands();
        self.normalize_sql_mode();
        Ok(())
    }

    fn connection_rejected(&self, reason: &str) -> Error {
        self.logger.log(
            LogEntry::new(LogLevel::Critical, "Could not connect to database server")
                .with("host", self.config.host.clone())
                .with("port", self.config.port)
                .with("socket", self.config.socket.clone().unwrap_or_default())
                .with("database", self.config.database_name.clone())
                .with("user", self.config.username.clone())
                .with("error", reason),
        );
        Error::connection(
            format!(
                "Could not connect to {} server {} as user '{}': {}",
                self.config.driver,
                self.config.endpoint(),
                self.config.username,
                reason
            ),
            codes::CONNECTION_REJECTED,
        )
    }

    fn run_post_connect_commands(&mut self) {
        let commands = self.config.post_connect_commands.clone();
        let Some(handle) = self.handle.as_deref_mut() else {
            return;
        };
        for command in commands.iter().filter(|c| !c.trim().is_empty()) {
            match handle.query(command) {
                Ok(mut stmt) => stmt.close_cursor(),
                Err(e) => self.logger.log(
                    LogEntry::new(
                        LogLevel::Error,
                        "Could not initialize database connection with query",
                    )
                    .with("query", command.as_str())
                    .with("error", e.to_string()),
                ),
            }
        }
    }

    /// Strip NO_BACKSLASH_ESCAPES from the MySQL session sql_mode
    fn normalize_sql_mode(&mut self) {
        if !self.config.driver.is_mysql_family() {
            return;
        }
        let Some(handle) = self.handle.as_deref_mut() else {
            return;
        };

        let current = match handle.query("SELECT @@SESSION.sql_mode") {
            Ok(mut stmt) => stmt
                .fetch()
                .and_then(|row| row.values().next().and_then(SqlValue::to_literal))
                .unwrap_or_default(),
            Err(e) => {
                self.logger.log(
                    LogEntry::new(LogLevel::Warn, "Could not read the session sql_mode")
                        .with("error", e.to_string()),
                );
                return;
            }
        };

        let modes: Vec<&str> = current.split(',').filter(|m| !m.is_empty()).collect();
        if !modes.contains(&NO_BACKSLASH_ESCAPES) {
            return;
        }
        let cleaned: Vec<&str> = modes
            .into_iter()
            .filter(|m| *m != NO_BACKSLASH_ESCAPES)
            .collect();
        let sql = format!(
            "SET SESSION sql_mode = {}",
            handle.quote(&cleaned.join(","))
        );
        if let Err(e) = handle.query(&sql) {
            self.logger.log(
                LogEntry::new(LogLevel::Warn, "Could not reset the session sql_mode")
                    .with("query", sql)
                    .with("error", e.to_string()),
            );
        }
    }

    /// True when a handle is present and reports itself live
    pub fn is_connected(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_connected())
    }

    /// Close the connection; returns false when there was none
    pub fn close(&mut self) -> bool {
        self.platform = None;
        self.schema_manager = None;
        match self.handle.take() {
            Some(mut handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    pub fn disconnect_if_connected(&mut self) {
        if self.is_connected() {
            self.close();
        }
    }

    /// Adopt an already open driver connection
    pub fn set_database_handle(&mut self, handle: Box<dyn DriverConnection>) {
        self.close();
        let platform = handle.platform();
        self.schema_manager = Some(handle.schema_manager());
        self.platform = Some(platform);
        self.handle = Some(handle);
    }

    fn live_handle(&mut self) -> Result<&mut dyn DriverConnection> {
        self.connect()?;
        match self.handle.as_deref_mut() {
            Some(handle) => Ok(handle),
            None => Err(closed()),
        }
    }

    /// Platform of the live connection, connecting if needed
    pub fn platform(&mut self) -> Result<Arc<dyn Platform>> {
        self.connect()?;
        self.platform.clone().ok_or_else(closed)
    }

    /// Platform of the current connection, without connecting
    pub fn current_platform(&self) -> Option<&Arc<dyn Platform>> {
        self.platform.as_ref()
    }

    // ---------------------------------------------------------------------
    // Statement dispatch
    // ---------------------------------------------------------------------

    /// Execute raw SQL, connecting if needed
    ///
    /// Updates the affected-row count for mutating statements.
    pub fn query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.record_built_query(sql);
        let result = self.live_handle()?.query(sql);
        self.finish_statement(sql, result, true)
    }

    /// Execute an introspection or management statement
    ///
    /// Unlike [`query`](Self::query) this leaves the affected-row count alone.
    pub fn admin_query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.record_built_query(sql);
        let result = self.live_handle()?.query(sql);
        self.finish_statement(sql, result, false)
    }

    /// Execute SQL with bound parameters in platform placeholder syntax
    pub fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn Statement>> {
        self.record_built_query(sql);
        let result = self.live_handle()?.execute_prepared(sql, params);
        self.finish_statement(sql, result, true)
    }

    fn finish_statement(
        &mut self,
        sql: &str,
        result: Result<Box<dyn Statement>>,
        track_affected: bool,
    ) -> Result<Box<dyn Statement>> {
        match result {
            Ok(stmt) => {
                if track_affected && !stmt.is_result_set() {
                    self.affected_rows = stmt.row_count();
                }
                Ok(stmt)
            }
            Err(e) => {
                if self.debug_output {
                    self.logger.log(
                        LogEntry::new(LogLevel::Error, "SQL error")
                            .with("query", sql)
                            .with("error", e.to_string()),
                    );
                }
                Err(e)
            }
        }
    }

    /// Rows affected by the most recent mutating statement
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn get_last_insert_id(&mut self) -> i64 {
        self.handle
            .as_deref_mut()
            .map(|h| h.last_insert_id())
            .unwrap_or(0)
    }

    /// Message of the last failed statement, empty if none
    pub fn sql_error(&self) -> String {
        self.handle
            .as_ref()
            .map(|h| h.error_message())
            .unwrap_or_default()
    }

    /// Code of the last failed statement, 0 if none
    pub fn sql_errno(&self) -> i64 {
        self.handle.as_ref().map(|h| h.error_code()).unwrap_or(0)
    }

    // ---------------------------------------------------------------------
    // Row fetching; dead handles are logged and yield None/false
    // ---------------------------------------------------------------------

    fn live_statement<'s>(
        &self,
        stmt: Option<&'s mut dyn Statement>,
        operation: &str,
    ) -> Option<&'s mut dyn Statement> {
        match stmt {
            Some(stmt) if stmt.is_open() => Some(stmt),
            _ => {
                self.logger.log(
                    LogEntry::new(
                        LogLevel::Warn,
                        format!("{}(): the passed result is not a valid statement handle", operation),
                    )
                    .with("operation", operation),
                );
                None
            }
        }
    }

    /// Next row keyed by column name
    pub fn fetch_assoc(&self, stmt: Option<&mut dyn Statement>) -> Option<Row> {
        self.live_statement(stmt, "fetch_assoc")?.fetch()
    }

    /// Next row as positional values
    pub fn fetch_row(&self, stmt: Option<&mut dyn Statement>) -> Option<Vec<SqlValue>> {
        self.live_statement(stmt, "fetch_row")?
            .fetch()
            .map(|row| row.into_values().collect())
    }

    /// One column of the next row
    pub fn fetch_column(&self, stmt: Option<&mut dyn Statement>, index: usize) -> Option<SqlValue> {
        self.live_statement(stmt, "fetch_column")?
            .fetch()
            .and_then(|row| row.get_index(index).map(|(_, value)| value.clone()))
    }

    pub fn fetch_all(&self, stmt: Option<&mut dyn Statement>) -> Option<Vec<Row>> {
        Some(self.live_statement(stmt, "fetch_all")?.fetch_all())
    }

    /// Close the cursor
    pub fn free_result(&self, stmt: Option<&mut dyn Statement>) -> bool {
        match self.live_statement(stmt, "free_result") {
            Some(stmt) => {
                stmt.close_cursor();
                true
            }
            None => false,
        }
    }

    pub fn num_rows(&self, stmt: Option<&mut dyn Statement>) -> Option<u64> {
        Some(self.live_statement(stmt, "num_rows")?.row_count())
    }

    pub fn data_seek(&self, stmt: Option<&mut dyn Statement>, position: usize) -> bool {
        self.live_statement(stmt, "data_seek")
            .is_some_and(|stmt| stmt.seek(position))
    }

    // ---------------------------------------------------------------------
    // Query object factories
    // ---------------------------------------------------------------------

    pub fn create_select_query(&mut self) -> Result<SelectQuery<'_>> {
        let platform = self.platform()?;
        Ok(SelectQuery::new(self, platform))
    }

    pub fn create_insert_query(&mut self) -> Result<InsertQuery<'_>> {
        let platform = self.platform()?;
        Ok(InsertQuery::new(self, platform))
    }

    pub fn create_update_query(&mut self) -> Result<UpdateQuery<'_>> {
        let platform = self.platform()?;
        Ok(UpdateQuery::new(self, platform))
    }

    pub fn create_delete_query(&mut self) -> Result<DeleteQuery<'_>> {
        let platform = self.platform()?;
        Ok(DeleteQuery::new(self, platform))
    }

    pub fn create_truncate_query(&mut self) -> Result<TruncateQuery<'_>> {
        let platform = self.platform()?;
        Ok(TruncateQuery::new(self, platform))
    }

    /// Platform TRUNCATE statement for a table
    pub fn truncate_sql(&mut self, table: &str) -> Result<String> {
        Ok(self.platform()?.truncate_table_sql(table))
    }

    /// Prepare a statement with `?` or `:name` parameters
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement<'_>> {
        let platform = self.platform()?;
        PreparedStatement::new(self, platform, sql)
    }

    // ---------------------------------------------------------------------
    // Quoting
    // ---------------------------------------------------------------------

    pub fn quoter(&mut self) -> Result<Quoter> {
        Ok(Quoter::new(self.platform()?))
    }

    pub fn quote(&mut self, value: &SqlValue, allow_null: bool) -> Result<String> {
        Ok(self.quoter()?.quote(value, allow_null))
    }

    pub fn quote_str(&mut self, value: &str) -> Result<String> {
        Ok(self.quoter()?.quote_str(value))
    }

    pub fn full_quote_str(&mut self, value: &str) -> Result<String> {
        Ok(self.quoter()?.full_quote_str(value))
    }

    pub fn full_quote_array(
        &mut self,
        values: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        allow_null: bool,
    ) -> Result<IndexMap<String, String>> {
        Ok(self
            .quoter()?
            .full_quote_array(values, no_quote_fields, allow_null))
    }

    pub fn quote_identifier(&mut self, identifier: &str) -> Result<String> {
        Ok(self.quoter()?.quote_identifier(identifier))
    }

    pub fn quote_column(&mut self, column: &str, table: Option<&str>) -> Result<String> {
        Ok(self.quoter()?.quote_column(column, table))
    }

    pub fn quote_table(&mut self, table: &str) -> Result<String> {
        Ok(self.quoter()?.quote_table(table))
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    fn with_schema<T>(
        &mut self,
        f: impl FnOnce(&dyn SchemaManager, &mut dyn DriverConnection, &str) -> Result<T>,
    ) -> Result<T> {
        self.connect()?;
        let manager = self.schema_manager.clone().ok_or_else(closed)?;
        let database = self.config.database_name.clone();
        let handle = self.handle.as_deref_mut().ok_or_else(closed)?;
        f(manager.as_ref(), handle, &database)
    }

    pub fn list_databases(&mut self) -> Result<Vec<String>> {
        self.with_schema(|manager, handle, _| manager.list_databases(handle))
    }

    /// Tables of the current database keyed by name
    pub fn list_tables(&mut self) -> Result<IndexMap<String, TableInfo>> {
        let tables = self.with_schema(|manager, handle, db| manager.list_tables(handle, db))?;
        Ok(tables.into_iter().map(|t| (t.name.clone(), t)).collect())
    }

    /// Columns of a table keyed by field name
    pub fn list_fields(&mut self, table: &str) -> Result<IndexMap<String, ColumnInfo>> {
        let columns =
            self.with_schema(|manager, handle, db| manager.list_table_columns(handle, table, db))?;
        Ok(columns.into_iter().map(|c| (c.field.clone(), c)).collect())
    }

    pub fn list_keys(&mut self, table: &str) -> Result<Vec<IndexInfo>> {
        self.with_schema(|manager, handle, db| manager.list_table_indexes(handle, table, db))
    }

    /// Character sets keyed by name, with their description
    pub fn list_database_charsets(&mut self) -> Result<IndexMap<String, String>> {
        let charsets = self.with_schema(|manager, handle, _| manager.list_charsets(handle))?;
        Ok(charsets
            .into_iter()
            .map(|c| (c.name, c.description))
            .collect())
    }

    pub fn count_tables(&mut self) -> Result<usize> {
        Ok(self.list_tables()?.len())
    }
}

fn closed() -> Error {
    Error::connection("The database connection is closed", codes::CONNECTION_CLOSED)
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("driver", &self.config.driver)
            .field("endpoint", &self.config.endpoint())
            .field("database", &self.config.database_name)
            .field("connected", &self.is_connected())
            .field("affected_rows", &self.affected_rows)
            .finish()
    }
}
