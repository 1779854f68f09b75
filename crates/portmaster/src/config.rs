//! Configuration management for portmaster.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "portmaster";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "portmaster.db";

/// Default directory name for exported reports.
const REPORTS_DIR_NAME: &str = "reports";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PORTMASTER_`)
/// 2. TOML config file at `~/.config/portmaster/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Card reader configuration.
    pub reader: ReaderConfig,
    /// Report export configuration.
    pub reports: ReportsConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Seed data configuration.
    pub seed: SeedConfig,
    /// User interface configuration.
    pub ui: UiConfig,
    /// History listing configuration.
    pub history: HistoryConfig,
}

/// Which backing store to use for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Persistent `SQLite` database file.
    #[default]
    Sqlite,
    /// Process-local memory, discarded on exit.
    Memory,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backing store for all tables.
    pub backend: StorageBackend,
    /// Path to the database file.
    /// Defaults to `~/.local/share/portmaster/portmaster.db`
    pub database_path: Option<PathBuf>,
}

/// Card reader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Card UID returned by the simulated reader.
    pub simulated_uid: String,
    /// Make the simulated reader report a hardware fault.
    pub simulate_fault: bool,
}

/// Report export configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Directory where exported reports are written.
    /// Defaults to `~/.local/share/portmaster/reports`
    pub output_dir: Option<PathBuf>,
}

/// Authentication configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Password given to the seeded operator accounts.
    pub seed_password: String,
}

/// Seed data configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Insert the demo fishers when the fisher table is empty.
    pub demo_fishers: bool,
}

/// UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    /// Arabic (right-to-left).
    #[default]
    #[serde(rename = "ar")]
    Arabic,
    /// French.
    #[serde(rename = "fr")]
    French,
}

/// User interface configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Language of status messages.
    pub language: Language,
}

/// History listing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of NFC log entries returned by a listing.
    pub nfc_log_limit: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            simulated_uid: "04:a1:b2:c3".to_string(),
            simulate_fault: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            seed_password: "123456".to_string(),
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { demo_fishers: true }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { nfc_log_limit: 100 }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PORTMASTER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth.seed_password.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "auth.seed_password must not be empty".to_string(),
            });
        }

        if self.reader.simulated_uid.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "reader.simulated_uid must not be empty".to_string(),
            });
        }

        if self.history.nfc_log_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "history.nfc_log_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the report output directory, resolving defaults if not set.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.reports
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(REPORTS_DIR_NAME))
    }
}
