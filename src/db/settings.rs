//! Key/value settings repository.
//!
//! Settings are read fresh on every call so administrative changes apply to
//! the next decision without a restart.

use sqlx::SqlitePool;

use crate::config::StorageDefaults;
use crate::{LanshareError, Result};

/// Default global quota (4GB).
pub const DEFAULT_QUOTA_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Default upload request cap (15GB).
pub const DEFAULT_MAX_REQUEST_BYTES: u64 = 15 * 1024 * 1024 * 1024;

/// Default single file cap (1GB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024 * 1024;

/// Default seconds between background sweeps.
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 60;

/// Known setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    /// Global quota in bytes.
    QuotaBytes,
    /// Upload request size cap in bytes (0 = unlimited).
    MaxRequestBytes,
    /// Single file size cap in bytes (0 = unlimited).
    MaxFileBytes,
    /// Seconds between background sweeps.
    CleanupIntervalSeconds,
}

impl SettingKey {
    /// All keys, in seeding order.
    pub const ALL: [SettingKey; 4] = [
        SettingKey::QuotaBytes,
        SettingKey::MaxRequestBytes,
        SettingKey::MaxFileBytes,
        SettingKey::CleanupIntervalSeconds,
    ];

    /// Key as stored in the settings table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::QuotaBytes => "quota_bytes",
            SettingKey::MaxRequestBytes => "max_request_bytes",
            SettingKey::MaxFileBytes => "max_file_bytes",
            SettingKey::CleanupIntervalSeconds => "cleanup_interval_seconds",
        }
    }

    /// Value used when the row is missing.
    pub fn default_value(&self) -> u64 {
        match self {
            SettingKey::QuotaBytes => DEFAULT_QUOTA_BYTES,
            SettingKey::MaxRequestBytes => DEFAULT_MAX_REQUEST_BYTES,
            SettingKey::MaxFileBytes => DEFAULT_MAX_FILE_BYTES,
            SettingKey::CleanupIntervalSeconds => DEFAULT_CLEANUP_INTERVAL_SECONDS,
        }
    }

    fn seed_value(&self, defaults: &StorageDefaults) -> u64 {
        match self {
            SettingKey::QuotaBytes => defaults.quota_bytes,
            SettingKey::MaxRequestBytes => defaults.max_request_bytes,
            SettingKey::MaxFileBytes => defaults.max_file_bytes,
            SettingKey::CleanupIntervalSeconds => defaults.cleanup_interval_seconds,
        }
    }
}

/// Repository for the settings table.
pub struct SettingsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new SettingsRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert any missing keys. Existing values are left untouched.
    pub async fn seed_defaults(&self, defaults: &StorageDefaults) -> Result<()> {
        for key in SettingKey::ALL {
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key.as_str())
                .bind(key.seed_value(defaults).to_string())
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    /// Get a raw setting value.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool)
            .await?;

        Ok(value.map(|(v,)| v))
    }

    /// Insert or replace a setting value.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Read a numeric setting, falling back to the key's default when absent.
    pub async fn get_u64(&self, key: SettingKey) -> Result<u64> {
        match self.get(key.as_str()).await? {
            None => Ok(key.default_value()),
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                LanshareError::Config(format!(
                    "setting {} has non-numeric value {raw:?}",
                    key.as_str()
                ))
            }),
        }
    }

    /// Store a numeric setting.
    pub async fn set_u64(&self, key: SettingKey, value: u64) -> Result<()> {
        self.set(key.as_str(), &value.to_string()).await
    }

    /// Global quota in bytes.
    pub async fn quota_bytes(&self) -> Result<u64> {
        self.get_u64(SettingKey::QuotaBytes).await
    }

    /// Single file cap in bytes (0 = unlimited).
    pub async fn max_file_bytes(&self) -> Result<u64> {
        self.get_u64(SettingKey::MaxFileBytes).await
    }

    /// Upload request cap in bytes (0 = unlimited).
    pub async fn max_request_bytes(&self) -> Result<u64> {
        self.get_u64(SettingKey::MaxRequestBytes).await
    }

    /// Seconds between background sweeps.
    pub async fn cleanup_interval_seconds(&self) -> Result<u64> {
        self.get_u64(SettingKey::CleanupIntervalSeconds).await
    }
}
