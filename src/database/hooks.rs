//! Query observers
//!
//! Observers are registered explicitly at startup and invoked in
//! registration order around the legacy facade's query operations. They see
//! the operation's arguments and the connection but cannot change either.

use crate::database::connection::DatabaseConnection;
use crate::database::types::SqlValue;
use crate::legacy::SelectQueryParts;
use indexmap::IndexMap;
use std::sync::Arc;

/// Observer of query-building operations
///
/// Every method defaults to a no-op; implement only what you need.
#[allow(unused_variables)]
pub trait QueryObserver: Send + Sync {
    fn before_insert(
        &self,
        table: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        conn: &DatabaseConnection,
    ) {
    }

    fn before_insert_multiple(
        &self,
        table: &str,
        fields: &[String],
        rows: &[Vec<SqlValue>],
        no_quote_fields: &[&str],
        conn: &DatabaseConnection,
    ) {
    }

    fn before_update(
        &self,
        table: &str,
        where_clause: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        conn: &DatabaseConnection,
    ) {
    }

    fn before_delete(&self, table: &str, where_clause: &str, conn: &DatabaseConnection) {}

    fn before_truncate(&self, table: &str, conn: &DatabaseConnection) {}

    fn after_select(&self, parts: &SelectQueryParts, conn: &DatabaseConnection) {}

    fn after_insert(
        &self,
        table: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        conn: &DatabaseConnection,
    ) {
    }

    fn after_insert_multiple(
        &self,
        table: &str,
        fields: &[String],
        rows: &[Vec<SqlValue>],
        no_quote_fields: &[&str],
        conn: &DatabaseConnection,
    ) {
    }

    fn after_update(
        &self,
        table: &str,
        where_clause: &str,
        fields: &IndexMap<String, SqlValue>,
        no_quote_fields: &[&str],
        conn: &DatabaseConnection,
    ) {
    }

    fn after_delete(&self, table: &str, where_clause: &str, conn: &DatabaseConnection) {}

    fn after_truncate(&self, table: &str, conn: &DatabaseConnection) {}
}

/// Ordered list of registered observers
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn QueryObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn QueryObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Observers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn QueryObserver>> {
        self.observers.iter()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
