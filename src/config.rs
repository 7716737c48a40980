//! Configuration module for LANSHARE.

use serde::Deserialize;
use std::path::Path;

use crate::db;
use crate::{LanshareError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/lanshare.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the flat storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

fn default_storage_path() -> String {
    "Temp".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
        }
    }
}

/// Initial values for the settings table.
///
/// These are only written when a key is absent, so later administrative
/// changes made through the API survive restarts.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageDefaults {
    /// Global quota in bytes.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
    /// Maximum upload request size in bytes (0 = unlimited).
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: u64,
    /// Maximum single file size in bytes (0 = unlimited).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Seconds between background sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_quota_bytes() -> u64 {
    db::DEFAULT_QUOTA_BYTES
}

fn default_max_request_bytes() -> u64 {
    db::DEFAULT_MAX_REQUEST_BYTES
}

fn default_max_file_bytes() -> u64 {
    db::DEFAULT_MAX_FILE_BYTES
}

fn default_cleanup_interval() -> u64 {
    db::DEFAULT_CLEANUP_INTERVAL_SECONDS
}

impl Default for StorageDefaults {
    fn default() -> Self {
        Self {
            quota_bytes: default_quota_bytes(),
            max_request_bytes: default_max_request_bytes(),
            max_file_bytes: default_max_file_bytes(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/lanshare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins (empty = allow any).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Settings seeded on first start.
    #[serde(default)]
    pub storage: StorageDefaults,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(LanshareError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| LanshareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `LANSHARE_DB_PATH`: database file path
    /// - `LANSHARE_STORAGE_PATH`: storage directory
    /// - `LANSHARE_PORT`: listen port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("LANSHARE_DB_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }

        if let Ok(path) = std::env::var("LANSHARE_STORAGE_PATH") {
            if !path.is_empty() {
                self.files.storage_path = path;
            }
        }

        if let Ok(port) = std::env::var("LANSHARE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(LanshareError::Config(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.files.storage_path.trim().is_empty() {
            return Err(LanshareError::Config(
                "files.storage_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
