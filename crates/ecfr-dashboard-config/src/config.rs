// crates/ecfr-dashboard-config/src/config.rs
// ============================================================================
// Module: Dashboard Configuration
// Description: Configuration loading and validation for the dashboard server.
// Purpose: Provide strict, fail-closed config parsing with safe defaults.
// Dependencies: ecfr-dashboard-store-sqlite, ecfr-dashboard-store-postgres, serde, toml
// ============================================================================

//! ## Overview
//! The config loader resolves a TOML file from the CLI path, the
//! `ECFR_DASHBOARD_CONFIG` environment variable, or `ecfr-dashboard.toml` in
//! the working directory. Inputs are untrusted: file size and path lengths are
//! bounded, unknown store types fail to parse, and validation rejects
//! non-loopback binds unless explicitly allowed.
//!
//! The Postgres connection string may be supplied through
//! `ECFR_DASHBOARD_DATABASE_URL` so credentials stay out of the file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use ecfr_dashboard_store_postgres::PostgresStoreConfig;
use ecfr_dashboard_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default config file name.
pub const DEFAULT_CONFIG_NAME: &str = "ecfr-dashboard.toml";
/// Environment variable holding the config path.
pub const CONFIG_ENV_VAR: &str = "ECFR_DASHBOARD_CONFIG";
/// Environment variable overriding `store.connection`.
pub const DATABASE_URL_ENV_VAR: &str = "ECFR_DASHBOARD_DATABASE_URL";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a connection string.
const MAX_CONNECTION_LENGTH: usize = 4096;
/// Upper bound for the Postgres pool size.
const MAX_POOL_SIZE: u32 = 256;
/// Default bind address for the HTTP server.
const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// Default `SQLite` database path.
const DEFAULT_SQLITE_PATH: &str = "ecfr_analysis.db";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// Parse error for config contents.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation error for config values.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Dashboard configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Data store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl DashboardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let mut config = Self::from_toml_bytes(&bytes)?;
        config.apply_env_overrides(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from raw TOML bytes without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the payload is too large, not UTF-8, or
    /// not valid TOML for this model.
    pub fn from_toml_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_ENV_VAR) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.store.connection = Some(trimmed.to_string());
            }
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()
    }
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Serve the embedded dashboard page at `/`.
    #[serde(default = "default_true")]
    pub dashboard: bool,
    /// Include raw store error detail in API error bodies.
    #[serde(default)]
    pub expose_error_detail: bool,
    /// Permit binding to non-loopback addresses.
    #[serde(default)]
    pub allow_non_loopback: bool,
    /// Request audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            dashboard: true,
            expose_error_detail: false,
            allow_non_loopback: false,
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind must be non-empty".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let addr = self.bind_addr()?;
        if !addr.ip().is_loopback() && !self.allow_non_loopback {
            return Err(ConfigError::Invalid(
                "non-loopback bind disallowed without server.allow_non_loopback".to_string(),
            ));
        }
        self.audit.validate()
    }
}

/// Audit logging configuration for API requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Local `SQLite` database file.
    #[default]
    Sqlite,
    /// Hosted Postgres database.
    Postgres,
}

/// Data store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// `SQLite` busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Postgres connection string.
    #[serde(default)]
    pub connection: Option<String>,
    /// Postgres pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Postgres connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Postgres statement timeout in milliseconds.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            connection: None,
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
            statement_timeout_ms: default_statement_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Sqlite => {
                if self.connection.is_some() {
                    return Err(ConfigError::Invalid(
                        "sqlite store must not set connection".to_string(),
                    ));
                }
                if let Some(path) = &self.path {
                    validate_path_string("store.path", &path.to_string_lossy())?;
                }
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Postgres => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("postgres store must not set path".to_string()));
                }
                let connection = self.connection.as_deref().unwrap_or_default().trim();
                if connection.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "postgres store requires connection or {DATABASE_URL_ENV_VAR}"
                    )));
                }
                if connection.len() > MAX_CONNECTION_LENGTH {
                    return Err(ConfigError::Invalid(
                        "store.connection exceeds max length".to_string(),
                    ));
                }
                if self.max_connections == 0 || self.max_connections > MAX_POOL_SIZE {
                    return Err(ConfigError::Invalid(format!(
                        "store.max_connections must be between 1 and {MAX_POOL_SIZE}"
                    )));
                }
                if self.connect_timeout_ms == 0 || self.statement_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "postgres store timeouts must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        let path = self.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH));
        SqliteStoreConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }

    /// Builds the Postgres store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no connection string is set.
    pub fn postgres_config(&self) -> Result<PostgresStoreConfig, ConfigError> {
        let connection = self
            .connection
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid("postgres store requires connection".to_string())
            })?;
        Ok(PostgresStoreConfig {
            connection: connection.to_string(),
            max_connections: self.max_connections,
            connect_timeout_ms: self.connect_timeout_ms,
            statement_timeout_ms: self.statement_timeout_ms,
        })
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default for boolean flags that are on unless disabled.
const fn default_true() -> bool {
    true
}

/// Default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Default Postgres pool size.
const fn default_max_connections() -> u32 {
    16
}

/// Default Postgres connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Default Postgres statement timeout.
const fn default_statement_timeout_ms() -> u64 {
    30_000
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path from CLI, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string from config against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn defaults_are_loopback_sqlite() {
        let config = DashboardConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert!(config.server.dashboard);
        assert_eq!(config.store.store_type, StoreType::Sqlite);
        assert_eq!(config.store.sqlite_config().path, PathBuf::from("ecfr_analysis.db"));
        config.validate().unwrap();
    }

    #[test]
    fn validate_path_rejects_long_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        assert!(validate_path(Path::new(&long)).is_err());
        assert!(validate_path(Path::new("dir/ecfr-dashboard.toml")).is_ok());
    }

    #[test]
    fn cli_path_wins_resolution() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }
}
