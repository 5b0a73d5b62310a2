// crates/stride-core/src/core/log.rs
// ============================================================================
// Module: Stride Debug Log Ring
// Description: Bounded FIFO debug log persisted through the step store.
// Purpose: Provide a crash-surviving diagnostic trail without external
//          logging dependencies.
// Dependencies: crate::core::keys, crate::interfaces, serde, serde_json
// ============================================================================

//! ## Overview
//! The debug log is an ordered sequence of `{timestamp, level, tag, message}`
//! entries persisted as a JSON array under a single store key, capped at 500
//! entries with oldest-first eviction. It is a peripheral sink: append
//! failures never abort the operation that produced them, and a malformed
//! persisted payload reads back as an empty log.
//!
//! Clearing the log is the only store write the reader process performs
//! under the single-writer rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::keys::DEBUG_LOG_KEY;
use crate::interfaces::StepStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of retained log entries.
pub const MAX_LOG_ENTRIES: usize = 500;

// ============================================================================
// SECTION: Log Entries
// ============================================================================

/// Log severity level.
///
/// # Invariants
/// - Variants serialize as upper-case strings, stable in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine lifecycle events.
    Info,
    /// Recoverable anomalies.
    Warn,
    /// Failures that abandoned an operation.
    Error,
}

impl LogLevel {
    /// Returns a stable label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// One persisted log entry.
///
/// # Invariants
/// - `timestamp` is unix epoch milliseconds supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix epoch milliseconds when the entry was recorded.
    pub timestamp: i64,
    /// Severity level.
    pub level: LogLevel,
    /// Component tag that produced the entry.
    pub tag: String,
    /// Human-readable message.
    pub message: String,
}

impl LogEntry {
    /// Builds an entry timestamped at the supplied moment.
    #[must_use]
    pub fn at(
        now: OffsetDateTime,
        level: LogLevel,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0),
            level,
            tag: tag.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Debug Log
// ============================================================================

/// Bounded FIFO debug log persisted through a [`StepStore`].
///
/// # Invariants
/// - At most `capacity` entries are retained; the oldest are evicted first.
/// - `capacity` never exceeds [`MAX_LOG_ENTRIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugLog {
    /// Retention cap for persisted entries.
    capacity: usize,
}

impl Default for DebugLog {
    fn default() -> Self {
        Self {
            capacity: MAX_LOG_ENTRIES,
        }
    }
}

impl DebugLog {
    /// Creates a debug log with the given retention capacity, clamped to
    /// `1..=`[`MAX_LOG_ENTRIES`].
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        let clamped = if capacity == 0 {
            1
        } else if capacity > MAX_LOG_ENTRIES {
            MAX_LOG_ENTRIES
        } else {
            capacity
        };
        Self {
            capacity: clamped,
        }
    }

    /// Returns the retention capacity.
    #[must_use]
    pub const fn capacity(self) -> usize {
        self.capacity
    }

    /// Appends an entry, evicting the oldest entries beyond capacity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store read or durable write fails.
    pub fn append<S: StepStore + ?Sized>(
        self,
        store: &S,
        entry: LogEntry,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries(store)?;
        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }
        let payload = serde_json::to_string(&entries)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        store.set(DEBUG_LOG_KEY, &payload)
    }

    /// Appends an entry, discarding any failure.
    ///
    /// Best-effort paths (shutdown, failure reporting) must not let the
    /// peripheral sink abort them.
    pub fn append_best_effort<S: StepStore + ?Sized>(self, store: &S, entry: LogEntry) {
        let _ = self.append(store, entry);
    }

    /// Reads the persisted entries, oldest first.
    ///
    /// A malformed payload reads back as an empty log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store read fails.
    pub fn entries<S: StepStore + ?Sized>(self, store: &S) -> Result<Vec<LogEntry>, StoreError> {
        let Some(payload) = store.get(DEBUG_LOG_KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&payload).unwrap_or_default())
    }

    /// Removes all persisted entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store write fails.
    pub fn clear<S: StepStore + ?Sized>(self, store: &S) -> Result<(), StoreError> {
        store.remove(DEBUG_LOG_KEY)
    }
}
