//! Configuration management for Roost.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/roost/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Account store settings
    pub database: DatabaseConfig,
    /// Pool gating settings
    pub pool: PoolSettings,
    /// Login orchestration settings
    pub login: LoginSettings,
    /// Verification-code retrieval settings
    pub mail: MailSettings,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ROOST_DB_PATH`: Override the account database path
    /// - `ROOST_HEADLESS`: Override browser headless mode (true/false)
    /// - `ROOST_COOLDOWN_SECS`: Override the per-queue checkout cooldown
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("ROOST_DB_PATH") {
            config.database.path = Some(PathBuf::from(&val));
            tracing::debug!("Override database.path from env: {}", val);
        }

        if let Ok(val) = std::env::var("ROOST_HEADLESS") {
            if let Ok(headless) = val.parse() {
                config.login.headless = headless;
                tracing::debug!("Override login.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("ROOST_COOLDOWN_SECS") {
            if let Ok(secs) = val.parse() {
                config.pool.cooldown_secs = secs;
                tracing::debug!("Override pool.cooldown_secs from env: {}", secs);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/roost/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("sh", "roost", "roost").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/roost`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("sh", "roost", "roost").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the account database path: the configured override, or
    /// `accounts.db` under the data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("accounts.db")),
        }
    }
}

/// Account store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path; defaults to the XDG data directory when unset
    pub path: Option<PathBuf>,
}

/// Pool gating settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Default per-queue cooldown applied at checkout, in seconds
    pub cooldown_secs: u64,
    /// How long to wait between polls when every account is busy, in seconds
    pub wait_poll_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 900,
            wait_poll_secs: 5,
        }
    }
}

/// Login orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    /// Run the automation surface headless
    pub headless: bool,
    /// Attempts per account before giving up
    pub max_attempts: u32,
    /// Delay between attempts in seconds
    pub retry_delay_secs: u64,
    /// Directory for per-account browser profiles; defaults to the data dir
    pub profile_dir: Option<PathBuf>,
    /// Where to write failure screenshots; defaults to the data dir
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            headless: true,
            max_attempts: 3,
            retry_delay_secs: 5,
            profile_dir: None,
            screenshot_dir: None,
        }
    }
}

/// Verification-code retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Poll attempts before giving up on a code
    pub poll_attempts: u32,
    /// Base delay between polls in seconds; grows with each attempt
    pub poll_base_delay_secs: u64,
    /// IMAP connection timeout in seconds
    pub imap_timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            poll_attempts: 5,
            poll_base_delay_secs: 6,
            imap_timeout_secs: 30,
        }
    }
}
