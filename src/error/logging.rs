//! Logging boundary for dbal
//!
//! Degraded paths (dead result handles, failed post-connect commands, SQL
//! mode cleanup, connection failures) are reported as structured entries to
//! a [`LogSink`]. The default sink forwards to the `log` facade, so
//! applications keep using whatever logger they already install.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Mutex;

/// Log levels for structured entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Critical = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    fn as_log_level(&self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error | LogLevel::Critical => log::Level::Error,
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: Map<String, JsonValue>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Attach a context value
    pub fn with(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Receiver for structured log entries
pub trait LogSink: Send + Sync {
    fn log(&self, entry: LogEntry);

    /// Report use of a deprecated calling convention
    fn deprecation(&self, message: &str) {
        self.log(LogEntry::new(LogLevel::Warn, message).with("deprecated", true));
    }
}

/// Sink that forwards every entry to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, entry: LogEntry) {
        let level = entry.level.as_log_level();
        if entry.context.is_empty() {
            log::log!(target: "dbal", level, "{}", entry.message);
        } else {
            log::log!(
                target: "dbal",
                level,
                "{} {}",
                entry.message,
                JsonValue::Object(entry.context)
            );
        }
    }
}

/// Sink that keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_context() {
        let sink = MemoryLogSink::new();
        sink.log(
            LogEntry::new(LogLevel::Error, "Connection failed")
                .with("host", "db.local")
                .with("port", 3306),
        );

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].context["host"], "db.local");
        assert_eq!(entries[0].context["port"], 3306);
    }

    #[test]
    fn test_deprecation_is_a_warning() {
        let sink = MemoryLogSink::new();
        sink.deprecation("connect_db() parameters are deprecated");

        let entries = sink.entries();
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].context["deprecated"], true);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Critical > LogLevel::Error);
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
    }
}
