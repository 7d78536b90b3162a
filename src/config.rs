//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the arbitration case checker: WebDriver
//! endpoint, source-site parameters, storage location and logging, loaded from
//! a TOML file with environment-variable overrides and validation.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Non-zero timeouts and result limits, non-empty URLs
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use arbitr_checker::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("db path: {}", config.storage.db_path.display());
//! ```

use crate::errors::{CheckerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebDriver endpoint settings
    pub webdriver: WebDriverConfig,
    /// Source-site settings (URL, waits, limits)
    pub source: SourceConfig,
    /// Storage settings
    pub storage: StorageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// WebDriver endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// WebDriver server URL (chromedriver)
    pub server_url: String,
    /// HTTP request timeout towards the WebDriver endpoint, in seconds
    pub request_timeout_secs: u64,
    /// Browser window size passed on session creation
    pub window_size: String,
}

/// Source-site configuration for the case-search page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Case-search page URL
    pub base_url: String,
    /// Maximum number of cases to extract per search
    pub max_results: usize,
    /// Bounded wait for the query input and submit button, in seconds
    pub input_wait_secs: u64,
    /// Fixed settle delay after submitting the search, in seconds
    pub settle_delay_secs: u64,
    /// Bounded wait for the results container, in seconds
    pub results_wait_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file path
    pub db_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| CheckerError::Config {
                message: format!("Failed to read config file {:?}: {}", path, e),
            })?;
            toml::from_str(&content).map_err(|e| CheckerError::Config {
                message: format!("Failed to parse config file {:?}: {}", path, e),
            })?
        } else {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("ARBITR_WEBDRIVER_URL") {
            self.webdriver.server_url = url;
        }
        if let Ok(db_path) = std::env::var("ARBITR_DB_PATH") {
            self.storage.db_path = PathBuf::from(db_path);
        }
        if let Ok(level) = std::env::var("ARBITR_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.webdriver.server_url.is_empty() {
            return Err(CheckerError::Validation {
                field: "webdriver.server_url".to_string(),
                reason: "WebDriver URL cannot be empty".to_string(),
            });
        }
        if self.source.base_url.is_empty() {
            return Err(CheckerError::Validation {
                field: "source.base_url".to_string(),
                reason: "Source URL cannot be empty".to_string(),
            });
        }
        if self.source.max_results == 0 {
            return Err(CheckerError::Validation {
                field: "source.max_results".to_string(),
                reason: "max_results must be greater than zero".to_string(),
            });
        }
        if self.source.input_wait_secs == 0 || self.source.results_wait_secs == 0 {
            return Err(CheckerError::Validation {
                field: "source".to_string(),
                reason: "bounded waits must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver: WebDriverConfig::default(),
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            request_timeout_secs: 30,
            window_size: "1920,1080".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://kad.arbitr.ru/".to_string(),
            max_results: 10,
            input_wait_secs: 10,
            settle_delay_secs: 5,
            results_wait_secs: 20,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/arbitration.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
