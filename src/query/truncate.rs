//! TRUNCATE query object

use crate::database::connection::DatabaseConnection;
use crate::database::platforms::Platform;
use crate::error::{codes, Error, Result};
use std::fmt;
use std::sync::Arc;

/// TRUNCATE builder; the statement text comes from the platform
pub struct TruncateQuery<'a> {
    conn: &'a mut DatabaseConnection,
    platform: Arc<dyn Platform>,
    table: String,
}

impl<'a> TruncateQuery<'a> {
    pub(crate) fn new(conn: &'a mut DatabaseConnection, platform: Arc<dyn Platform>) -> Self {
        Self {
            conn,
            platform,
            table: String::new(),
        }
    }

    pub fn truncate(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn get_sql(&self) -> Result<String> {
        if self.table.trim().is_empty() {
            return Err(Error::invalid_query(
                "No table given for TRUNCATE",
                codes::MISSING_TABLE,
            ));
        }
        Ok(self.platform.truncate_table_sql(&self.table))
    }

    pub fn execute(self) -> Result<()> {
        let sql = self.get_sql()?;
        let mut stmt = self.conn.query(&sql)?;
        stmt.close_cursor();
        Ok(())
    }
}

impl fmt::Debug for TruncateQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TruncateQuery")
            .field("table", &self.table)
            .finish()
    }
}
