//! Legacy procedural facade
//!
//! [`LegacyConnection`] keeps the older procedural calling convention alive
//! (`exec_select_query`, `sql_fetch_assoc`, `admin_get_tables`, ...) on top
//! of a [`DatabaseConnection`] it owns. Clauses arrive as loose SQL strings
//! and are translated into query objects; registered [`QueryObserver`]s are
//! notified around every query-building operation.
//!
//! Building functions (`insert_query`, `select_query`, ...) return SQL and
//! never execute it. The `exec_*` variants build, execute and notify the
//! `after_*` observers.

pub mod helpers;

use crate::database::connection::DatabaseConnection;
use crate::database::driver::{Row, Statement};
use crate::database::hooks::{ObserverRegistry, QueryObserver};
use crate::database::quoting::Quoter;
use crate::database::schema::{ColumnInfo, IndexInfo, TableInfo};
use crate::database::types::SqlValue;
use crate::error::{codes, Error, LogEntry, LogLevel, Result};
use crate::query::PreparedStatement;
use helpers::OrderItem;
use indexmap::IndexMap;
use std::sync::Arc;

/// The parts of a legacy SELECT, as passed to `exec_select_query_array`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQueryParts {
    pub select: String,
    pub from: String,
    pub where_clause: String,
    pub group_by: String,
    pub order_by: String,
    pub limit: String,
}

impl SelectQueryParts {
    pub fn new(select: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            from: from.into(),
            ..Default::default()
        }
    }

    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = group_by.into();
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = limit.into();
        self
    }
}

/// Procedural facade over a [`DatabaseConnection`]
#[derive(Debug)]
pub struct LegacyConnection {
    connection: DatabaseConnection,
    observers: ObserverRegistry,
}

impl From<DatabaseConnection> for LegacyConnection {
    fn from(connection: DatabaseConnection) -> Self {
        Self::new(connection)
    }
}

impl LegacyConnection {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self::with_observers(connection, ObserverRegistry::new())
    }

    pub fn with_observers(connection: DatabaseConnection, observers: ObserverRegistry) -> Self {
        Self {
            connection,
            observers,
        }
    }

    /// Register an observer; observers run in registration order
    pub fn register_observer(&mut self, observer: Arc<dyn QueryObserver>) {
        self.observers.register(observer);
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut DatabaseConnection {
        &mut self.connection
    }

    pub fn into_inner(self) -> DatabaseConnection {
        self.connection
    }

    fn notify(&self, event: impl Fn(&dyn QueryObserver, &DatabaseConnection)) {
        for observer in self.observers.iter() {
            event(observer.as_ref(), &self.connection);
        }
    }

    fn deprecated(&self, message: &str) {
        self.connection.logger().deprecation(message);
    }

    // ---------------------------------------------------------------------
    // Connecting
    // ---------------------------------------------------------------------

    /// Connect, optionally applying the deprecated positional parameters
    ///
    /// Each given parameter is logged as deprecated and applied through the
    /// matching setter before connecting.
    pub fn connect_db(
        &mut self,
        host: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        database: Option<&str>,
    ) -> Result<()> {
        if let Some(host) = host {
            self.deprecated("Passing a host to connect_db() is deprecated, use set_database_host()");
            self.connection.set_database_host(host);
        }
        if let Some(username) = username {
            self.deprecated(
                "Passing a username to connect_db() is deprecated, use set_database_username()",
            );
            self.connection.set_database_username(username);
        }
        if let Some(password) = password {
            self.deprecated(
                "Passing a password to connect_db() is deprecated, use set_database_password()",
            );
            self.connection.set_database_password(password);
        }
        if let Some(database) = database {
            self.deprecated(
                "Passing a database name to connect_db() is deprecated, use set_database_name()",
            );
            self.connection.set_database_name(database);
        }
        self.connection.connect()
    }

    /// Deprecated alias of [`connect_db`](Self::connect_db)
    pub fn sql_pconnect(&mut self) -> Result<()> {
        self.deprecated("sql_pconnect() is deprecated, use connect_db()");
        self.connection.connect()
    }

    /// Deprecated: the database is selected while connecting
    pub fn sql_select_db(&mut self) -> bool {
        self.deprecated("sql_select_db() is deprecated, the database is selected by connect_db()");
        self.connection.connect().is_ok()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    // ---------------------------------------------------------------------
    // Query building
    // ---------------------------------------------------------------------

    /// Build an INSERT statement
    pub fn insert_query(
        &mut self,
        table: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
    ) -> Result<String> {
        self.notify(|o, conn| o.before_insert(table, fields, no_quote_fields, conn));
        let sql = self
            .connection
            .create_insert_query()?
            .into(table)
            .values(fields.iter().map(|(k, v)| (k.clone(), v.clone())))
            .no_quote_fields(no_quote_fields.iter().copied())
            .get_sql()?;
        self.connection.record_built_query(&sql);
        Ok(sql)
    }

    /// Build a multi-row INSERT statement
    pub fn insert_multiple_rows(
        &mut self,
        table: &str,
        fields: &[String],
        rows: &[Vec<SqlValue>],
        no_quote_fields: &[&str],
    ) -> Result<String> {
        self.notify(|o, conn| o.before_insert_multiple(table, fields, rows, no_quote_fields, conn));
        let mut query = self
            .connection
            .create_insert_query()?
            .into(table)
            .columns(fields.iter().cloned())
            .no_quote_fields(no_quote_fields.iter().copied());
        for row in rows {
            query = query.add_row(row.iter().cloned())?;
        }
        let sql = query.get_sql()?;
        self.connection.record_built_query(&sql);
        Ok(sql)
    }

    /// Build an UPDATE statement; an empty WHERE updates every row
    pub fn update_query(
        &mut self,
        table: &str,
        where_clause: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
    ) -> Result<String> {
        self.notify(|o, conn| o.before_update(table, where_clause, fields, no_quote_fields, conn));
        let mut query = self.connection.create_update_query()?.update(table);
        for (column, value) in fields {
            query = if no_quote_fields.contains(&column.as_str()) {
                query.set_raw(column.clone(), value.to_literal().unwrap_or_else(|| "NULL".into()))
            } else {
                query.set(column.clone(), value.clone())
            };
        }
        let where_clause = helpers::strip_logical_operator_prefix(where_clause);
        if !where_clause.is_empty() {
            query = query.where_(where_clause)?;
        }
        let sql = query.get_sql()?;
        self.connection.record_built_query(&sql);
        Ok(sql)
    }

    /// Build a DELETE statement; an empty WHERE deletes every row
    pub fn delete_query(&mut self, table: &str, where_clause: &str) -> Result<String> {
        self.notify(|o, conn| o.before_delete(table, where_clause, conn));
        let mut query = self.connection.create_delete_query()?.delete(table, None);
        let where_clause = helpers::strip_logical_operator_prefix(where_clause);
        if !where_clause.is_empty() {
            query = query.where_(where_clause)?;
        }
        let sql = query.get_sql()?;
        self.connection.record_built_query(&sql);
        Ok(sql)
    }

    /// Build a SELECT statement from legacy clause strings
    pub fn select_query(
        &mut self,
        select: &str,
        from: &str,
        where_clause: &str,
        group_by: &str,
        order_by: &str,
        limit: &str,
    ) -> Result<String> {
        let order = helpers::parse_order_by(order_by);
        let limit = helpers::parse_limit(limit)?;

        let mut query = self
            .connection
            .create_select_query()?
            .select([select.trim()])
            .from([from.trim()]);
        let where_clause = helpers::strip_logical_operator_prefix(where_clause);
        if !where_clause.is_empty() {
            query = query.where_(where_clause)?;
        }
        query = query.group_by(helpers::parse_group_by(group_by));
        for item in order {
            query = match item {
                OrderItem::Column(column, direction) => query.order_by(column, direction.as_str())?,
                OrderItem::Raw(expression) => query.order_by_raw(expression),
            };
        }
        if let Some((count, offset)) = limit {
            query = query.limit(count, offset);
        }

        let sql = query.get_sql()?;
        self.connection.record_built_query(&sql);
        Ok(sql)
    }

    /// Build a SELECT for use as a subquery
    pub fn select_subquery(&mut self, select: &str, from: &str, where_clause: &str) -> Result<String> {
        self.select_query(select, from, where_clause, "", "", "")
    }

    /// Build the platform TRUNCATE statement
    pub fn truncate_query(&mut self, table: &str) -> Result<String> {
        self.notify(|o, conn| o.before_truncate(table, conn));
        let sql = self.connection.create_truncate_query()?.truncate(table).get_sql()?;
        self.connection.record_built_query(&sql);
        Ok(sql)
    }

    /// Membership test of `value` in the comma separated list column `field`
    pub fn list_query(&mut self, field: &str, value: &str) -> Result<String> {
        if value.contains(',') {
            return Err(Error::invalid_argument(
                format!("list_query(): value '{}' must not contain a comma", value),
                codes::INVALID_LIST_VALUE,
            ));
        }
        Ok(self.connection.platform()?.find_in_set_expression(field, value))
    }

    /// LIKE search of every word across the given fields
    ///
    /// A word matches when any field contains it; words are combined with
    /// `constraint` (`AND` unless `OR` is given). No words yield an empty
    /// string.
    pub fn search_query(
        &mut self,
        words: &[&str],
        fields: &[&str],
        table: &str,
        constraint: &str,
    ) -> Result<String> {
        if words.is_empty() || fields.is_empty() {
            return Ok(String::new());
        }
        let operator = if constraint.trim().eq_ignore_ascii_case("OR") {
            "OR"
        } else {
            "AND"
        };
        let quoter = self.connection.quoter()?;
        let escape = quoter.full_quote_str("\\");

        let word_parts: Vec<String> = words
            .iter()
            .map(|word| {
                let pattern = quoter.quote_str(&quoter.escape_str_for_like(word));
                fields
                    .iter()
                    .map(|field| format!("{}.{} LIKE '%{}%' ESCAPE {}", table, field, pattern, escape))
                    .collect::<Vec<_>>()
                    .join(" OR ")
            })
            .collect();
        Ok(format!(
            "({})",
            word_parts.join(&format!(") {} (", operator))
        ))
    }

    // ---------------------------------------------------------------------
    // Query execution
    // ---------------------------------------------------------------------

    /// Execute an INSERT; returns the number of inserted rows
    pub fn exec_insert_query(
        &mut self,
        table: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
    ) -> Result<u64> {
        let sql = self.insert_query(table, fields, no_quote_fields)?;
        let affected = self.execute_mutation(&sql)?;
        self.notify(|o, conn| o.after_insert(table, fields, no_quote_fields, conn));
        Ok(affected)
    }

    pub fn exec_insert_multiple_rows(
        &mut self,
        table: &str,
        fields: &[String],
        rows: &[Vec<SqlValue>],
        no_quote_fields: &[&str],
    ) -> Result<u64> {
        let sql = self.insert_multiple_rows(table, fields, rows, no_quote_fields)?;
        let affected = self.execute_mutation(&sql)?;
        self.notify(|o, conn| o.after_insert_multiple(table, fields, rows, no_quote_fields, conn));
        Ok(affected)
    }

    pub fn exec_update_query(
        &mut self,
        table: &str,
        where_clause: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
    ) -> Result<u64> {
        let sql = self.update_query(table, where_clause, fields, no_quote_fields)?;
        let affected = self.execute_mutation(&sql)?;
        self.notify(|o, conn| o.after_update(table, where_clause, fields, no_quote_fields, conn));
        Ok(affected)
    }

    pub fn exec_delete_query(&mut self, table: &str, where_clause: &str) -> Result<u64> {
        let sql = self.delete_query(table, where_clause)?;
        let affected = self.execute_mutation(&sql)?;
        self.notify(|o, conn| o.after_delete(table, where_clause, conn));
        Ok(affected)
    }

    pub fn exec_truncate_query(&mut self, table: &str) -> Result<()> {
        let sql = self.truncate_query(table)?;
        self.execute_mutation(&sql)?;
        self.notify(|o, conn| o.after_truncate(table, conn));
        Ok(())
    }

    fn execute_mutation(&mut self, sql: &str) -> Result<u64> {
        let mut stmt = self.connection.query(sql)?;
        let affected = stmt.row_count();
        stmt.close_cursor();
        Ok(affected)
    }

    /// Build and execute a SELECT; returns the row cursor
    pub fn exec_select_query(
        &mut self,
        select: &str,
        from: &str,
        where_clause: &str,
        group_by: &str,
        order_by: &str,
        limit: &str,
    ) -> Result<Box<dyn Statement>> {
        let parts = SelectQueryParts {
            select: select.to_string(),
            from: from.to_string(),
            where_clause: where_clause.to_string(),
            group_by: group_by.to_string(),
            order_by: order_by.to_string(),
            limit: limit.to_string(),
        };
        self.exec_select_query_array(&parts)
    }

    pub fn exec_select_query_array(&mut self, parts: &SelectQueryParts) -> Result<Box<dyn Statement>> {
        let sql = self.select_query(
            &parts.select,
            &parts.from,
            &parts.where_clause,
            &parts.group_by,
            &parts.order_by,
            &parts.limit,
        )?;
        let stmt = self.connection.query(&sql)?;
        self.notify(|o, conn| o.after_select(parts, conn));
        Ok(stmt)
    }

    /// All rows of a SELECT
    pub fn exec_select_get_rows(
        &mut self,
        select: &str,
        from: &str,
        where_clause: &str,
        group_by: &str,
        order_by: &str,
        limit: &str,
    ) -> Result<Vec<Row>> {
        let mut stmt =
            self.exec_select_query(select, from, where_clause, group_by, order_by, limit)?;
        let rows = stmt.fetch_all();
        stmt.close_cursor();
        Ok(rows)
    }

    /// All rows of a SELECT keyed by the value of `index_field`
    ///
    /// Later rows replace earlier ones with the same key.
    #[allow(clippy::too_many_arguments)]
    pub fn exec_select_get_rows_indexed(
        &mut self,
        select: &str,
        from: &str,
        where_clause: &str,
        group_by: &str,
        order_by: &str,
        limit: &str,
        index_field: &str,
    ) -> Result<IndexMap<String, Row>> {
        let rows = self.exec_select_get_rows(select, from, where_clause, group_by, order_by, limit)?;
        let mut indexed = IndexMap::with_capacity(rows.len());
        for row in rows {
            let key = row
                .get(index_field)
                .and_then(SqlValue::to_literal)
                .ok_or_else(|| {
                    Error::invalid_argument(
                        format!("Index field '{}' is not part of the result", index_field),
                        codes::MISSING_INDEX_FIELD,
                    )
                })?;
            indexed.insert(key, row);
        }
        Ok(indexed)
    }

    /// First row of a SELECT, if any
    pub fn exec_select_get_single_row(
        &mut self,
        select: &str,
        from: &str,
        where_clause: &str,
        group_by: &str,
        order_by: &str,
    ) -> Result<Option<Row>> {
        let mut stmt =
            self.exec_select_query(select, from, where_clause, group_by, order_by, "1")?;
        let row = stmt.fetch();
        stmt.close_cursor();
        Ok(row)
    }

    /// `COUNT(field)` over the matching rows
    pub fn exec_select_count_rows(&mut self, field: &str, table: &str, where_clause: &str) -> Result<u64> {
        let select = format!("COUNT({})", field);
        let mut stmt = self.exec_select_query(&select, table, where_clause, "", "", "")?;
        let count = stmt
            .fetch()
            .and_then(|row| row.get_index(0).and_then(|(_, value)| value.as_i64()))
            .unwrap_or(0);
        stmt.close_cursor();
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Prepare a SELECT built from legacy clauses; may carry `:name` parameters
    pub fn prepare_select_query(
        &mut self,
        select: &str,
        from: &str,
        where_clause: &str,
        group_by: &str,
        order_by: &str,
        limit: &str,
    ) -> Result<PreparedStatement<'_>> {
        let sql = self.select_query(select, from, where_clause, group_by, order_by, limit)?;
        self.connection.prepare(&sql)
    }

    // ---------------------------------------------------------------------
    // sql_* passthroughs
    // ---------------------------------------------------------------------

    pub fn sql_query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.connection.query(sql)
    }

    pub fn sql_fetch_assoc(&self, stmt: Option<&mut dyn Statement>) -> Option<Row> {
        self.connection.fetch_assoc(stmt)
    }

    pub fn sql_fetch_row(&self, stmt: Option<&mut dyn Statement>) -> Option<Vec<SqlValue>> {
        self.connection.fetch_row(stmt)
    }

    pub fn sql_free_result(&self, stmt: Option<&mut dyn Statement>) -> bool {
        self.connection.free_result(stmt)
    }

    pub fn sql_num_rows(&self, stmt: Option<&mut dyn Statement>) -> Option<u64> {
        self.connection.num_rows(stmt)
    }

    pub fn sql_data_seek(&self, stmt: Option<&mut dyn Statement>, position: usize) -> bool {
        self.connection.data_seek(stmt, position)
    }

    pub fn sql_insert_id(&mut self) -> i64 {
        self.connection.get_last_insert_id()
    }

    pub fn sql_affected_rows(&self) -> u64 {
        self.connection.affected_rows()
    }

    pub fn sql_error(&self) -> String {
        self.connection.sql_error()
    }

    pub fn sql_errno(&self) -> i64 {
        self.connection.sql_errno()
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    pub fn admin_get_dbs(&mut self) -> Result<Vec<String>> {
        self.connection.list_databases()
    }

    pub fn admin_get_tables(&mut self) -> Result<IndexMap<String, TableInfo>> {
        self.connection.list_tables()
    }

    pub fn admin_get_fields(&mut self, table: &str) -> Result<IndexMap<String, ColumnInfo>> {
        self.connection.list_fields(table)
    }

    pub fn admin_get_keys(&mut self, table: &str) -> Result<Vec<IndexInfo>> {
        self.connection.list_keys(table)
    }

    pub fn admin_get_charsets(&mut self) -> Result<IndexMap<String, String>> {
        self.connection.list_database_charsets()
    }

    pub fn admin_query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.connection.admin_query(sql)
    }

    // ---------------------------------------------------------------------
    // Quoting and cleaning
    // ---------------------------------------------------------------------

    pub fn full_quote_str(&mut self, value: &str) -> Result<String> {
        self.connection.full_quote_str(value)
    }

    pub fn full_quote_array(
        &mut self,
        values: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        allow_null: bool,
    ) -> Result<IndexMap<String, String>> {
        self.connection
            .full_quote_array(values, no_quote_fields, allow_null)
    }

    pub fn quote_str(&mut self, value: &str) -> Result<String> {
        self.connection.quote_str(value)
    }

    pub fn escape_str_for_like(&mut self, value: &str) -> Result<String> {
        let quoter: Quoter = self.connection.quoter()?;
        Ok(quoter.escape_str_for_like(value))
    }

    pub fn clean_int_array<S: AsRef<str>>(&self, values: &[S]) -> Vec<i64> {
        helpers::clean_int_array(values)
    }

    pub fn clean_int_list(&self, list: &str) -> String {
        helpers::clean_int_list(list)
    }

    pub fn strip_order_by(&self, clause: &str) -> String {
        helpers::strip_order_by(clause)
    }

    pub fn strip_group_by(&self, clause: &str) -> String {
        helpers::strip_group_by(clause)
    }

    /// Report the last SQL error of `function` when debug output is on
    pub fn debug(&self, function: &str, query: &str) {
        if !self.connection.debug_output() {
            return;
        }
        let error = self.connection.sql_error();
        if error.is_empty() {
            return;
        }
        self.connection.logger().log(
            LogEntry::new(LogLevel::Error, format!("{}() failed", function))
                .with("caller", function)
                .with("error", error)
                .with("errno", self.connection.sql_errno())
                .with("query", query),
        );
    }
}
