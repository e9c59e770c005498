//! Shared test fixtures: a recording driver with canned responses

#![allow(dead_code)]

use dbal::database::driver::BufferedStatement;
use dbal::database::platforms::{create_platform, Platform};
use dbal::error::MemoryLogSink;
use dbal::{
    ConnectionConfig, DatabaseBackend, DatabaseConnection, Driver, DriverConnection, Error,
    Result, Row, SqlValue, Statement,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything the mock driver saw and will answer
#[derive(Default)]
pub struct MockState {
    pub connect_attempts: usize,
    pub fail_connect: bool,
    pub executed: Vec<String>,
    pub prepared: Vec<(String, Vec<SqlValue>)>,
    pub affected: u64,
    pub last_insert_id: i64,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
}

/// Driver that records every statement instead of talking to a server
#[derive(Clone)]
pub struct MockDriver {
    backend: DatabaseBackend,
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new(backend: DatabaseBackend) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Answer statements starting with `prefix` with `rows`
    pub fn respond(&self, prefix: &str, rows: Vec<Row>) {
        self.state().responses.push((prefix.to_string(), rows));
    }

    /// Reject statements starting with `prefix`
    pub fn fail_on(&self, prefix: &str) {
        self.state().failures.push(prefix.to_string());
    }

    pub fn set_affected(&self, affected: u64) {
        self.state().affected = affected;
    }

    pub fn refuse_connections(&self) {
        self.state().fail_connect = true;
    }

    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub fn last_executed(&self) -> Option<String> {
        self.state().executed.last().cloned()
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.executed.clear();
        state.prepared.clear();
    }
}

impl Driver for MockDriver {
    fn connect(&self, _config: &ConnectionConfig) -> Result<Box<dyn DriverConnection>> {
        let mut state = self.state();
        state.connect_attempts += 1;
        if state.fail_connect {
            return Err(Error::query("Connection refused", 2002));
        }
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            platform: create_platform(self.backend),
            connected: true,
            error: (0, String::new()),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
    platform: Arc<dyn Platform>,
    connected: bool,
    error: (i64, String),
}

impl MockConnection {
    fn answer(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let state = self.state.lock().unwrap();
        if state.failures.iter().any(|p| sql.starts_with(p.as_str())) {
            drop(state);
            self.error = (1064, format!("You have an error in your SQL syntax near '{}'", sql));
            return Err(Error::query(self.error.1.clone(), self.error.0));
        }
        let statement: Box<dyn Statement> = if dbal::database::driver::returns_rows(sql) {
            let rows = state
                .responses
                .iter()
                .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            Box::new(BufferedStatement::with_rows(rows))
        } else {
            Box::new(BufferedStatement::with_affected(state.affected))
        };
        drop(state);
        self.error = (0, String::new());
        Ok(statement)
    }
}

impl DriverConnection for MockConnection {
    fn query(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.state.lock().unwrap().executed.push(sql.to_string());
        self.answer(sql)
    }

    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> Result<Box<dyn Statement>> {
        self.state
            .lock()
            .unwrap()
            .prepared
            .push((sql.to_string(), params.to_vec()));
        self.answer(sql)
    }

    fn error_code(&self) -> i64 {
        self.error.0
    }

    fn error_message(&self) -> String {
        self.error.1.clone()
    }

    fn last_insert_id(&mut self) -> i64 {
        self.state.lock().unwrap().last_insert_id
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn platform(&self) -> Arc<dyn Platform> {
        self.platform.clone()
    }
}

/// Build a row from column/value pairs
pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A disconnected core for database `cms` wired to a mock driver and a
/// capturing log sink
pub fn mock_connection(
    backend: DatabaseBackend,
) -> (DatabaseConnection, MockDriver, Arc<MemoryLogSink>) {
    let driver = MockDriver::new(backend);
    let config = ConnectionConfig::builder()
        .driver(backend)
        .host("db.local")
        .username("web")
        .password("secret")
        .database_name("cms")
        .build();
    let sink = Arc::new(MemoryLogSink::new());
    let mut db = DatabaseConnection::with_driver(config, Arc::new(driver.clone()));
    db.set_logger(sink.clone());
    (db, driver, sink)
}
