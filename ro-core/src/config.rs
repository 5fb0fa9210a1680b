//! Application configuration management.
//!
//! Handles loading, saving, and accessing application configuration: where the
//! key-value database lives, how logging is set up, and the defaults used for
//! notifications and bulk imports. Configuration is persisted as TOML on disk.
//!
//! User-facing reminder settings (global toggle, time of day) are not part of
//! this file; they live in the key-value store next to the contacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::{APP_NAME, DB_FILE_NAME, DEFAULT_NOTIFICATION_TIME, REMINDER_CHANNEL_ID};
use crate::error::{RoError, RoResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Key-value database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Notification delivery settings.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Defaults applied to contacts imported from the device address book.
    #[serde(default)]
    pub import: ImportConfig,
}

/// Key-value database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file. If empty, uses default location.
    #[serde(default)]
    pub path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Application name shown on desktop notifications.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Channel identifier reminders are posted to.
    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// Time of day used when the settings record has never been written.
    #[serde(default = "default_notification_time")]
    pub default_time: String,

    /// Show due reminders as desktop notifications. When off they are
    /// only written to the log.
    #[serde(default = "default_true")]
    pub desktop: bool,
}

/// Bulk import defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Frequency assigned to imported contacts: daily, weekly or monthly.
    #[serde(default = "default_import_frequency")]
    pub default_frequency: String,

    /// Whether reminders start enabled for imported contacts.
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
}

// Default value functions for serde

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_app_name() -> String {
    APP_NAME.to_string()
}

fn default_channel_id() -> String {
    REMINDER_CHANNEL_ID.to_string()
}

fn default_notification_time() -> String {
    DEFAULT_NOTIFICATION_TIME.to_string()
}

fn default_import_frequency() -> String {
    "monthly".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            wal_mode: true,
            pool_size: default_pool_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            channel_id: default_channel_id(),
            default_time: default_notification_time(),
            desktop: true,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_frequency: default_import_frequency(),
            reminder_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> RoResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> RoResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> RoResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> RoResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RoError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> RoResult<PathBuf> {
        let config_dir = Platform::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the effective database path, using the configured path or the default.
    pub fn effective_db_path(&self) -> RoResult<PathBuf> {
        if self.storage.path.is_empty() {
            let data_dir = Platform::data_dir()?;
            Ok(data_dir.join(DB_FILE_NAME))
        } else {
            Ok(PathBuf::from(&self.storage.path))
        }
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> RoResult<PathBuf> {
        if self.logging.directory.is_empty() {
            let data_dir = Platform::data_dir()?;
            Ok(data_dir.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }
}

/// Thread-safe configuration holder for shared access across services.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }
}
