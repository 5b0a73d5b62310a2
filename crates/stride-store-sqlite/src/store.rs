// crates/stride-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Step Store
// Description: Durable, process-shared StepStore backed by SQLite WAL.
// Purpose: Give the reconciliation engine a synchronous store whose writes
//          are acknowledged only once durable and visible across processes.
// Dependencies: stride-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`StepStore`] over a single SQLite
//! key/value table. Durability and multi-process visibility are delegated to
//! SQLite: WAL journal mode plus `synchronous = FULL` means a successful
//! `set` has reached stable storage before it returns, and any process
//! opening the same database file observes it immediately afterwards. That
//! is exactly the contract the engine's commit/rollback decision depends on.
//!
//! The store performs no interpretation of values; bucket tables, the
//! lifetime total, and the debug log all persist as opaque strings under
//! their fixed keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use stride_core::StepStore;
use stride_core::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// SQLite schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// SQLite journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to SQLite `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended for concurrent readers).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the SQLite pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// SQLite sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to SQLite `synchronous` pragma settings.
/// - `Full` is required for the engine's durability contract; `Normal`
///   exists for hosts that accept weaker guarantees on read-mostly replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (durable before `set` returns).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the SQLite pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the SQLite step store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds and must be non-zero.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the SQLite database file.
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

/// Returns the default busy timeout for SQLite connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Validates runtime limits in the store configuration.
fn validate_config(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    if config.busy_timeout_ms == 0 {
        return Err(SqliteStoreError::Invalid(
            "busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if config.path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("path must not be empty".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// SQLite store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw persisted payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// SQLite engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed [`StepStore`] with WAL support.
///
/// # Invariants
/// - Connection access is serialized through a mutex within the process;
///   cross-process coordination is SQLite's (WAL + busy timeout).
/// - `set` returns only after SQLite acknowledges the write durable under
///   the configured sync mode.
#[derive(Clone)]
pub struct SqliteStepStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStepStore {
    /// Opens (and initializes when needed) the store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid, the
    /// database cannot be opened, the pragmas cannot be applied, or the
    /// stored schema version is incompatible.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_config(config)?;
        let mut connection = Connection::open(&config.path)
            .map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        apply_pragmas(&connection, config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the store is unavailable.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let guard =
            self.connection.lock().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        guard
            .execute_batch("SELECT 1")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }
}

impl StepStore for SqliteStepStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|err| StoreError::Store(err.to_string()))?;
        guard
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(|err| StoreError::Store(err.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|err| StoreError::Store(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|err| StoreError::Store(err.to_string()))?;
        guard
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Applies connection pragmas from the configuration.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            config.journal_mode.pragma_value()
        ))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA busy_timeout = {};", config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Creates the schema when absent and gates on the stored version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx =
        connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let stored: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match stored {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(version) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "stored schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}
