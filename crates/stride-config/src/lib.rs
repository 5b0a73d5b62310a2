// crates/stride-config/src/lib.rs
// ============================================================================
// Module: Stride Configuration
// Description: Canonical TOML configuration model and validation.
// Purpose: Give hosts one validated entry point for store and log settings.
// Dependencies: serde, stride-core, stride-store-sqlite, thiserror, toml
// ============================================================================

//! ## Overview
//! Stride configuration is a small TOML document with a `[store]` section
//! selecting the SQLite database and its durability pragmas, and an optional
//! `[log]` section bounding the debug ring. Loading is strict and
//! fail-closed: path guards, a file size limit, UTF-8 enforcement, and
//! per-limit validation all reject with a descriptive [`ConfigError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use stride_core::MAX_LOG_ENTRIES;
use stride_store_sqlite::SqliteJournalMode;
use stride_store_sqlite::SqliteStoreConfig;
use stride_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single config path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total config path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4_096;
/// Maximum config file size in bytes.
const MAX_CONFIG_BYTES: u64 = 1_048_576;
/// Default SQLite database file name.
const DEFAULT_STORE_PATH: &str = "stride.db";
/// Default busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file I/O error.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration value.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// Store configuration section.
///
/// # Invariants
/// - `path` is non-empty; `busy_timeout_ms` is non-zero.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    /// Path to the SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// SQLite journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// SQLite sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Debug log configuration section.
///
/// # Invariants
/// - `max_entries` is within `1..=500`; the persisted format's cap of 500
///   is the hard upper bound.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LogSection {
    /// Retention cap for debug log entries.
    #[serde(default = "default_log_entries")]
    pub max_entries: usize,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            max_entries: default_log_entries(),
        }
    }
}

/// Canonical Stride configuration.
///
/// # Invariants
/// - All sections satisfy their own invariants after [`StrideConfig::load`]
///   or an explicit [`StrideConfig::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrideConfig {
    /// Store configuration.
    #[serde(default)]
    pub store: StoreSection,
    /// Debug log configuration.
    #[serde(default)]
    pub log: LogSection,
}

/// Returns the default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default busy timeout in milliseconds.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default debug log retention cap.
const fn default_log_entries() -> usize {
    MAX_LOG_ENTRIES
}

// ============================================================================
// SECTION: Loading & Validation
// ============================================================================

impl StrideConfig {
    /// Loads configuration from a TOML file, or defaults when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path fails its guards, the file
    /// cannot be read, is oversized, is not UTF-8, fails to parse, or fails
    /// validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        validate_config_path(path)?;
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::Invalid(format!(
                "config file exceeds size limit: {} bytes (max {MAX_CONFIG_BYTES})",
                metadata.len()
            )));
        }
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        if self.store.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.log.max_entries == 0 || self.log.max_entries > MAX_LOG_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "log.max_entries out of range: {} (max {MAX_LOG_ENTRIES})",
                self.log.max_entries
            )));
        }
        Ok(())
    }

    /// Builds the SQLite store configuration from the store section.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.store.path.clone(),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
        }
    }
}

/// Validates config path length guards.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    let raw = path.as_os_str();
    if raw.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "config path exceeds max length: {} (max {MAX_TOTAL_PATH_LENGTH})",
            raw.len()
        )));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "config path component too long (max {MAX_PATH_COMPONENT_LENGTH})"
            )));
        }
    }
    Ok(())
}
