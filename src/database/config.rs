//! Connection configuration structures and parsing
//!
//! The host application assembles a [`ConnectionConfig`] from its own config
//! source (TOML files, environment) and hands it to the connection core. The
//! core never reads ambient configuration on its own.

use crate::database::types::DatabaseBackend;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use std::path::Path;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "DBAL_DB_";

/// Configuration for a single database connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Unix socket path; takes precedence over host/port when set
    pub socket: Option<String>,
    /// Database (schema) name; the file path for SQLite
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub driver: DatabaseBackend,
    pub charset: String,
    pub ssl_mode: Option<String>,
    pub persistent: bool,
    pub compression: bool,
    /// Statements run right after every successful connect
    pub post_connect_commands: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DatabaseBackend::MySQL.default_port(),
            socket: None,
            database_name: String::new(),
            username: String::new(),
            password: String::new(),
            driver: DatabaseBackend::MySQL,
            charset: default_charset(),
            ssl_mode: None,
            persistent: false,
            compression: false,
            post_connect_commands: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_charset() -> String {
    "utf8".to_string()
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
    }

    /// Host, port and socket rendered for log context
    pub fn endpoint(&self) -> String {
        match &self.socket {
            Some(socket) if !socket.is_empty() => socket.clone(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    /// Parse configuration from a TOML document
    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse database config: {}", e)))
    }

    /// Load configuration from TOML file
    #[cfg(feature = "config")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let value = load_toml_value(path.as_ref())?;
        value.try_into().map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}. Check TOML syntax.",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Load a base file and merge an override file on top of it
    ///
    /// The override file is optional; keys it sets win over the base.
    #[cfg(feature = "config")]
    pub fn load_layered<P: AsRef<Path>, Q: AsRef<Path>>(base: P, overrides: Q) -> Result<Self> {
        let mut merged = load_toml_value(base.as_ref())?;

        if overrides.as_ref().exists() {
            log::debug!(
                "Merging database config override from: {}",
                overrides.as_ref().display()
            );
            let override_value = load_toml_value(overrides.as_ref())?;
            merged = serde_toml_merge::merge(merged, override_value).map_err(|e| {
                Error::config(format!("Failed to merge configuration files: {}", e))
            })?;
        }

        merged
            .try_into()
            .map_err(|e| Error::config(format!("Failed to deserialize merged configuration: {}", e)))
    }

    /// Apply `DBAL_DB_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(std::env::vars())
    }

    /// Apply `DBAL_DB_*` overrides from the given key/value pairs
    pub fn apply_env_overrides_from<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            match name {
                "HOST" => self.host = value,
                "PORT" => {
                    self.port = value.parse().map_err(|_| {
                        Error::config(format!("{}PORT must be a port number, got '{}'", ENV_PREFIX, value))
                    })?
                }
                "SOCKET" => self.socket = Some(value).filter(|s| !s.is_empty()),
                "NAME" => self.database_name = value,
                "USERNAME" => self.username = value,
                "PASSWORD" => self.password = value,
                "DRIVER" => self.driver = value.parse()?,
                "CHARSET" => self.charset = value,
                _ => log::debug!("Ignoring unknown database override {}{}", ENV_PREFIX, name),
            }
        }
        Ok(())
    }
}

#[cfg(feature = "config")]
fn load_toml_value(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}. Make sure the file exists and is readable.",
            path.display(),
            e
        ))
    })?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| {
        Error::config(format!(
            "Failed to parse config file '{}': {}. Check TOML syntax.",
            path.display(),
            e
        ))
    })?;

    log::debug!("Loaded database config from: {}", path.display());
    Ok(value)
}

/// Builder for ConnectionConfig
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
    port_set: bool,
}

impl ConnectionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self.port_set = true;
        self
    }

    pub fn socket(mut self, socket: impl Into<String>) -> Self {
        self.config.socket = Some(socket.into());
        self
    }

    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.config.database_name = name.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Set the driver; the port follows the driver's default unless set explicitly
    pub fn driver(mut self, driver: DatabaseBackend) -> Self {
        self.config.driver = driver;
        if !self.port_set {
            self.config.port = driver.default_port();
        }
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = charset.into();
        self
    }

    pub fn ssl_mode(mut self, mode: impl Into<String>) -> Self {
        self.config.ssl_mode = Some(mode.into());
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.config.persistent = persistent;
        self
    }

    pub fn compression(mut self, compression: bool) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn post_connect_command(mut self, sql: impl Into<String>) -> Self {
        self.config.post_connect_commands.push(sql.into());
        self
    }

    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
