//! Configuration module for KeyDesk.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{
    errors::DomainError,
    key::{KeyRange, DEFAULT_FIRST_KEY, DEFAULT_LAST_KEY},
};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for KeyDesk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub keys: KeysConfig,
    pub storage: StorageConfig,
    pub mirror: MirrorConfig,
    pub logging: LoggingConfig,
}

/// Key range settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// First key number managed by the desk (inclusive).
    pub first_id: u32,
    /// Last key number managed by the desk (inclusive).
    pub last_id: u32,
}

impl KeysConfig {
    /// The configured range as a validated domain value.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRange` if `first_id > last_id`.
    pub fn range(&self) -> Result<KeyRange, DomainError> {
        KeyRange::new(self.first_id, self.last_id)
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

/// Registry mirror (background writer) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Capacity of the mirror update queue.
    pub queue_capacity: usize,
    /// Retries per update after the first attempt fails.
    pub max_retries: u32,
    /// Base delay in milliseconds between retries (doubles per attempt).
    pub retry_base_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/keydesk/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("keydesk")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            first_id: DEFAULT_FIRST_KEY,
            last_id: DEFAULT_LAST_KEY,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("keydesk")
                .join("keydesk.db"),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_retries: 5,
            retry_base_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"keys.first_id"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- keys ---
        if self.keys.first_id > self.keys.last_id {
            errors.push(ValidationError {
                field: "keys.first_id".into(),
                message: format!(
                    "first_id ({}) must not exceed last_id ({})",
                    self.keys.first_id, self.keys.last_id
                ),
            });
        }

        // --- storage ---
        if self.storage.db_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.db_path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- mirror ---
        if self.mirror.queue_capacity == 0 {
            errors.push(ValidationError {
                field: "mirror.queue_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.mirror.retry_base_ms == 0 {
            errors.push(ValidationError {
                field: "mirror.retry_base_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        // mirror.max_retries may be 0: a single attempt with no retries.

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use keydesk_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .keys_range(1, 100)
///     .storage_db_path(PathBuf::from("/tmp/keydesk.db"))
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- keys ---

    pub fn keys_range(mut self, first_id: u32, last_id: u32) -> Self {
        self.config.keys.first_id = first_id;
        self.config.keys.last_id = last_id;
        self
    }

    // --- storage ---

    pub fn storage_db_path(mut self, db_path: PathBuf) -> Self {
        self.config.storage.db_path = db_path;
        self
    }

    // --- mirror ---

    pub fn mirror_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.mirror.queue_capacity = capacity;
        self
    }

    pub fn mirror_max_retries(mut self, retries: u32) -> Self {
        self.config.mirror.max_retries = retries;
        self
    }

    pub fn mirror_retry_base_ms(mut self, ms: u64) -> Self {
        self.config.mirror.retry_base_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
