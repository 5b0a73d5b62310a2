// crates/stride-core/src/interfaces/mod.rs
// ============================================================================
// Module: Stride Interfaces
// Description: Backend-agnostic step store contract and in-memory reference.
// Purpose: Define the persistence seam the reconciliation engine writes
//          through.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The step store is the only shared mutable resource in the system. All
//! operations are synchronous and blocking by contract: a successful `set`
//! means the value is durable and immediately visible to any process reading
//! the same store. Fire-and-forget writes are disallowed because losing
//! durability breaks the monotonicity invariant across a crash; the `Result`
//! of `set` is load-bearing for the engine's commit/rollback decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Step store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("step store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("step store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("step store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("step store invalid data: {0}")]
    Invalid(String),
    /// Backing store reported an error.
    #[error("step store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Step Store
// ============================================================================

/// Process-shared, crash-durable key/value store.
///
/// Implementations must block until the write is durable before returning
/// `Ok` from [`StepStore::set`].
pub trait StepStore {
    /// Reads the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Durably writes `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write is not acknowledged durable.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the removal fails.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Memory Store
// ============================================================================

/// In-process [`StepStore`] for tests and ephemeral runs.
///
/// # Invariants
/// - Not process-shared; durability ends with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Key/value entries guarded for interior mutability.
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries =
            self.entries.lock().map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries =
            self.entries.lock().map_err(|err| StoreError::Store(err.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries =
            self.entries.lock().map_err(|err| StoreError::Store(err.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
